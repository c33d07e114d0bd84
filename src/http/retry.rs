//! Retry logic for network operations with intelligent error classification.

use reqwest::StatusCode;

/// Maximum number of retry attempts for network operations.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Errors that should not be retried.
#[derive(Debug)]
pub enum NonRetryableError {
    /// Rate limit exceeded (HTTP 429)
    RateLimitExceeded(String),
    /// Item not found or hidden (HTTP 404 / 410)
    NotFound(String),
    /// Forbidden access (HTTP 401 / 403)
    Forbidden(String),
    /// Other client errors that won't succeed on retry
    ClientError(String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::RateLimitExceeded(msg) => {
                write!(
                    f,
                    "Rate limit exceeded: {}. Lower --concurrency or try again later.",
                    msg
                )
            }
            NonRetryableError::NotFound(msg) => {
                write!(f, "Not found: {}", msg)
            }
            NonRetryableError::Forbidden(msg) => {
                write!(f, "Access forbidden: {}", msg)
            }
            NonRetryableError::ClientError(msg) => {
                write!(f, "Request error: {}", msg)
            }
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Classifies an error as retryable or non-retryable.
/// Returns Ok(()) if the error is retryable, Err with a user-friendly message if not.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    if let Some(status) = error.status() {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(NonRetryableError::Forbidden(format!(
                    "HTTP {}",
                    status.as_u16()
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(NonRetryableError::RateLimitExceeded(
                    "Too many requests".to_string(),
                ));
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                return Err(NonRetryableError::NotFound(
                    "The requested item page does not exist".to_string(),
                ));
            }
            // Other 4xx client errors are generally not retryable
            s if s.is_client_error() => {
                return Err(NonRetryableError::ClientError(format!(
                    "HTTP {} error",
                    s.as_u16()
                )));
            }
            // 5xx server errors are retryable
            _ => {}
        }
    }

    // Connection errors, timeouts, etc. are retryable
    Ok(())
}

/// Checks if an error from `error_for_status()` should be retried.
/// Returns the original error if retryable, or a NonRetryableError if not.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_error(status: usize) -> reqwest::Error {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/")
            .with_status(status)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let response = client.get(server.url()).send().await.unwrap();
        response.error_for_status().unwrap_err()
    }

    #[test]
    fn test_non_retryable_error_display() {
        let err = NonRetryableError::RateLimitExceeded("test".to_string());
        assert!(err.to_string().contains("Rate limit"));
        assert!(err.to_string().contains("--concurrency"));

        let err = NonRetryableError::NotFound("test".to_string());
        assert!(err.to_string().contains("Not found"));

        let err = NonRetryableError::Forbidden("test".to_string());
        assert!(err.to_string().contains("forbidden"));

        let err = NonRetryableError::ClientError("HTTP 400".to_string());
        assert!(err.to_string().contains("Request error"));
    }

    #[tokio::test]
    async fn test_classify_error_forbidden() {
        let err = status_error(403).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_too_many_requests() {
        let err = status_error(429).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::RateLimitExceeded(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_not_found() {
        let err = status_error(404).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_other_client_error() {
        let err = status_error(400).await;
        assert!(matches!(
            classify_error(&err),
            Err(NonRetryableError::ClientError(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_error_server_error_is_retryable() {
        let err = status_error(502).await;
        assert!(classify_error(&err).is_ok());
    }

    #[tokio::test]
    async fn test_check_retryable() {
        let err = status_error(404).await;
        assert!(
            check_retryable(err)
                .downcast_ref::<NonRetryableError>()
                .is_some()
        );

        let err = status_error(503).await;
        assert!(
            check_retryable(err)
                .downcast_ref::<NonRetryableError>()
                .is_none()
        );
    }
}
