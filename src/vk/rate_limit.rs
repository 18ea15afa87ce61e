// Request throttling for the VK API.
//
// The API allows at most 3 requests per second for a user token. Each
// `execute` batch counts as a single request, so the fetch loop calls
// `acquire()` once per batch. This is a sliding-window limiter: it keeps
// the timestamps of recent requests and sleeps until the oldest one falls
// out of the window when the window is full.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tracing::debug;

/// Requests allowed per window for the VK API.
pub const VK_REQUESTS_PER_SECOND: u32 = 3;

/// A sliding-window rate limiter.
pub struct RateLimiter {
    /// Timestamps of requests within the current window.
    requests: Mutex<VecDeque<Instant>>,
    /// Maximum number of requests allowed per window.
    max_requests: u32,
    /// Duration of the sliding window.
    window: Duration,
    /// Minimum delay between consecutive requests.
    min_delay: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// - `max_requests`: how many requests are allowed in the window
    /// - `window`: the sliding window duration
    /// - `min_delay`: minimum time between consecutive requests
    pub fn new(max_requests: u32, window: Duration, min_delay: Duration) -> Self {
        Self {
            requests: Mutex::new(VecDeque::new()),
            max_requests: max_requests.max(1),
            window,
            min_delay,
        }
    }

    /// The limiter matching VK's documented limit (3 requests per second).
    pub fn vk_default() -> Self {
        Self::new(VK_REQUESTS_PER_SECOND, Duration::from_secs(1), Duration::ZERO)
    }

    /// Wait until a request is allowed, then record it.
    ///
    /// The first `max_requests` calls in an idle window return immediately.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let now = Instant::now();
                let mut requests = self.requests.lock().await;

                // Evict requests that have fallen outside the window
                while let Some(&oldest) = requests.front() {
                    if now.duration_since(oldest) >= self.window {
                        requests.pop_front();
                    } else {
                        break;
                    }
                }

                let since_last = requests
                    .back()
                    .map(|&last| now.duration_since(last))
                    .unwrap_or(Duration::MAX);

                if since_last < self.min_delay {
                    Some(self.min_delay - since_last)
                } else if (requests.len() as u32) < self.max_requests {
                    requests.push_back(now);
                    None
                } else {
                    // Window is full: wait until the oldest request expires
                    requests
                        .front()
                        .map(|&oldest| (oldest + self.window).duration_since(now))
                }
            };

            match wait {
                None => return,
                Some(wait) => {
                    debug!(
                        delay_ms = wait.as_millis() as u64,
                        "Rate limit: waiting before next request"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Number of requests currently inside the window (including expired
    /// entries not yet evicted).
    #[cfg(test)]
    async fn in_flight(&self) -> usize {
        self.requests.lock().await.len()
    }
}
