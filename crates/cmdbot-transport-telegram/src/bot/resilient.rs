//! Resilient Bot API calls with automatic retry.
//!
//! Transient failures (network errors, I/O errors and flood-control
//! `RetryAfter` responses) are retried with exponential backoff and jitter.
//! API rejections are returned immediately: repeating them cannot succeed.

use crate::config::{
    TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
};
use cmdbot_core::transport::TransportError;
use std::future::Future;
use std::time::Duration;
use teloxide::RequestError;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::warn;

/// Whether `error` may go away on its own.
#[must_use]
pub const fn is_transient(error: &RequestError) -> bool {
    matches!(
        error,
        RequestError::Network(_) | RequestError::Io(_) | RequestError::RetryAfter(_)
    )
}

/// Map a teloxide error onto the transport-neutral error.
#[must_use]
pub fn transport_error(error: RequestError) -> TransportError {
    if is_transient(&error) {
        TransportError::Network(error.to_string())
    } else {
        TransportError::Api(error.to_string())
    }
}

/// Run a Bot API operation, retrying transient failures.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first
/// non-transient error.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    // 500ms, 1s, 2s, ... capped at TELEGRAM_API_MAX_BACKOFF_MS
    let retry_strategy = ExponentialBackoff::from_millis(2)
        .factor(TELEGRAM_API_INITIAL_BACKOFF_MS / 2)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    RetryIf::spawn(retry_strategy, operation, is_transient)
        .await
        .map_err(|e| {
            if is_transient(&e) {
                warn!(
                    "Telegram API operation failed after {} retries: {}",
                    TELEGRAM_API_MAX_RETRIES, e
                );
            }
            e
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use teloxide::ApiError;

    #[test]
    fn test_api_errors_are_not_transient() {
        assert!(!is_transient(&RequestError::Api(ApiError::BotBlocked)));
        assert!(!is_transient(&RequestError::Api(ApiError::MessageNotModified)));
    }

    #[test]
    fn test_api_error_maps_to_api_variant() {
        let mapped = transport_error(RequestError::Api(ApiError::BotBlocked));
        assert!(matches!(mapped, TransportError::Api(_)));
    }

    #[tokio::test]
    async fn test_api_error_is_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), RequestError> = retry_telegram_operation(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(RequestError::Api(ApiError::BotBlocked))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_passes_through() -> Result<(), RequestError> {
        let value = retry_telegram_operation(|| async { Ok::<_, RequestError>(42) }).await?;
        assert_eq!(value, 42);
        Ok(())
    }
}
