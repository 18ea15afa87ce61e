// Pipeline: fetch walls, normalize, fit, and prepare the visualization.
//
// `fetch` handles the network side (and saved wall files); `analyze` is the
// pure part from posts to visualization data, so it can be tested offline.

pub mod analyze;
pub mod fetch;
