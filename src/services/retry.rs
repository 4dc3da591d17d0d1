//! Retry controller
//!
//! Wraps a fallible async operation with bounded retry and backoff. Attempts
//! are strictly sequential; the next one starts only after the previous
//! failure has been observed and the delay has elapsed.

use crate::models::request::RequestId;
use crate::utils::cancel::{cancelled_or_pending, CancellationToken};
use crate::utils::error::{is_retryable, retry_delay_ms, OzonError, OzonResult};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Run `operation` up to `max_retries + 1` times
///
/// Errors that are not retryable, and the error of the last permitted
/// attempt, are returned unchanged. Cancellation observed during a backoff
/// wait ends the call with [`OzonError::Cancelled`].
pub async fn execute_with_retry<T, F, Fut>(
    mut operation: F,
    max_retries: u32,
    call_id: &RequestId,
    cancellation: Option<&CancellationToken>,
) -> OzonResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = OzonResult<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(call_id = %call_id, "Request succeeded after {} retries", attempt);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if attempt >= max_retries || !is_retryable(&error) {
            return Err(error);
        }

        let delay = retry_delay_ms(&error, attempt);
        warn!(
            call_id = %call_id,
            error_type = error.error_type(),
            "Request {} failed, retrying in {}ms (attempt {}/{})",
            call_id,
            delay,
            attempt + 1,
            max_retries.saturating_add(1)
        );

        tokio::select! {
            biased;

            _ = cancelled_or_pending(cancellation) => {
                debug!(call_id = %call_id, "Cancelled during retry backoff");
                return Err(OzonError::cancelled(error.request_id().cloned()));
            }
            _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
        }

        attempt += 1;
    }
}
