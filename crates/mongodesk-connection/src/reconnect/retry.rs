//! Retry policy for dials

use std::future::Future;
use std::time::Duration;

use mongodesk_core::Result;

use super::backoff::BackoffStrategy;

/// Upper bound on any single retry delay
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// How many times to attempt a dial and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: BackoffStrategy,
}

impl RetryPolicy {
    /// Create a policy making at most `max_attempts` attempts (at least one)
    pub fn new(max_attempts: u32, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Doubling delays starting at `base_delay`
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        let base_ms = base_delay.as_millis() as u64;
        Self::new(max_attempts, BackoffStrategy::new(base_ms, MAX_RETRY_DELAY_MS))
    }

    /// A single attempt with no retry
    pub fn no_retry() -> Self {
        Self::new(1, BackoffStrategy::new(0, 0))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. The closure receives the zero-based attempt
    /// number. The error of the final attempt is returned.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(attempt = attempt + 1, "dial succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt + 1 >= self.max_attempts => {
                    tracing::warn!(
                        attempts = self.max_attempts,
                        category = ?e.failure_category(),
                        "giving up after final dial attempt"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff.calculate_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        category = ?e.failure_category(),
                        "dial attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    /// Three attempts, one second base delay
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(1_000))
    }
}
