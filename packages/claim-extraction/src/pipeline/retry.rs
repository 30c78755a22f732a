//! Bounded exponential backoff for extractor calls.

use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{ExtractorError, FailureKind};
use crate::types::config::RetryConfig;

/// Why a retried operation gave up.
#[derive(Debug, Clone)]
pub enum RetryError {
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: ExtractorError },
    /// A non-retryable failure ended the sequence early.
    NonRetryable(ExtractorError),
    /// The caller's token fired mid-call or mid-backoff.
    Cancelled,
}

/// Run `op` until it succeeds, fails non-retryably, or runs out of attempts.
///
/// `op` receives the 1-based attempt number. Backoff sleeps are
/// suspension points and are abandoned on cancellation.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    model: &str,
    mut op: F,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ExtractorError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            result = op(attempt) => result,
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if error.failure_kind() == FailureKind::NonRetryable {
            tracing::warn!(model, attempt, error = %error, "Non-retryable extractor failure");
            return Err(RetryError::NonRetryable(error));
        }

        if attempt >= max_attempts {
            tracing::warn!(model, attempts = attempt, error = %error, "Retries exhausted");
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: error,
            });
        }

        let wait = config.backoff(attempt);
        tracing::warn!(
            model,
            attempt,
            wait_ms = wait.as_millis() as u64,
            error = %error,
            "Extractor call failed, retrying..."
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }
        attempt += 1;
    }
}
