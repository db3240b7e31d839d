use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{TransportError, TransportResult};

const DEFAULT_RATE_LIMIT_RETRIES: u32 = 1;
const DEFAULT_MAX_WAIT_SECS: u64 = 120;

/// How a unit of work reacts to a rate-limit signal.
///
/// The unit is retried up to `retries` times, sleeping the signaled wait
/// (capped at `max_wait_secs`) before each retry. Other errors are returned
/// immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub retries: u32,
    pub max_wait_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RATE_LIMIT_RETRIES,
            max_wait_secs: DEFAULT_MAX_WAIT_SECS,
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, max_wait_secs: u64) -> Self {
        Self {
            retries,
            max_wait_secs,
        }
    }

    pub fn delay_for(&self, requested: Duration) -> Duration {
        requested.min(Duration::from_secs(self.max_wait_secs))
    }

    /// Run `op`, retrying on rate limits. The sleep suspends only the calling task.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> TransportResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(TransportError::RateLimited(wait)) if attempt < self.retries => {
                    attempt += 1;
                    let delay = self.delay_for(wait);
                    warn!(
                        "{} rate limited, retrying in {}s (attempt {}/{})",
                        label,
                        delay.as_secs(),
                        attempt,
                        self.retries
                    );
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}
