//! Retry with fixed delay.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, TychoError};

/// Retry policy: up to `max_retries` additional attempts, fixed
/// `retry_delay` between them. Only errors whose
/// [`is_retryable`](TychoError::is_retryable) holds are retried;
/// everything else surfaces immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Execute an async operation under this policy.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.max_retries {
                        return Err(e);
                    }
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }
}
