//! Per-call execution-time budget.

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, TychoError};

/// Race a future against a deadline.
///
/// Exceeding the budget yields [`TychoError::Timeout`], which the retry
/// policy treats as terminal.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TychoError::Timeout(duration.as_millis() as u64)),
    }
}
