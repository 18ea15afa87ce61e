// VK API access: client, request throttling, and wall fetching.
//
// Each submodule handles one concern: the HTTP client and `execute`
// envelope, the sliding-window throttle, and the batched wall loop.

pub mod client;
pub mod rate_limit;
pub mod wall;
