//! Minimum spacing between outbound API requests.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a fixed minimum delay between consecutive requests.
///
/// The throttle is global to one client: every request of every metric
/// resolver goes through the same governor, because the remote API keys its
/// abuse limits on the caller, not on the query shape. The first request of
/// a session is never delayed.
#[derive(Debug)]
pub struct RateGovernor {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateGovernor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    /// Blocks until at least the configured delay has passed since the
    /// previous paced request, then records the current request.
    pub async fn pace(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
