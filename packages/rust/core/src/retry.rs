//! Retry with exponential backoff for transient source failures.

use std::future::Future;
use std::time::Duration;

use rulegraph_shared::{FetchConfig, Result};
use tokio::time::sleep;
use tracing::{info, warn};

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: MAX_BACKOFF,
        }
    }

    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `f` until it succeeds, fails with a non-transient error, or
    /// `max_retries` retries are used up.
    pub async fn retry<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, attempts = attempt + 1, "succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(operation, attempts = attempt, error = %e, "giving up after retries");
                        return Err(e);
                    }
                    warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    if !backoff.is_zero() {
                        sleep(backoff).await;
                    }
                    backoff = (backoff * 2).min(self.max_backoff);
                }
            }
        }
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff_ms)
    }
}
