//! Bounded retry policy for transient I/O failures.
//!
//! A [`RetryPolicy`] is an explicit value composed around an async operation,
//! replacing scattered ad-hoc retry loops. Validation errors are programmer
//! or data errors and must not be wrapped in a policy; only wrap operations
//! whose failures can be transient (network calls, store round-trips).

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Retries an async operation a bounded number of times with a fixed delay.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    retries: u32,
    /// Fixed delay between attempts.
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy that retries `retries` times with `delay` between
    /// attempts. `RetryPolicy::new(0, ..)` runs the operation exactly once.
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// Policy used for conditional feed checks: one retry, no backoff.
    pub fn single_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Policy used for entry content fetches: three retries, 2 s apart.
    pub fn content_fetch() -> Self {
        Self::new(3, Duration::from_secs(2))
    }

    /// Run `op`, retrying on error until the retry budget is exhausted.
    ///
    /// The final error is returned unchanged; intermediate failures are
    /// logged at debug level with the attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!(label, attempt, error = %err, "retrying after failure");
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
