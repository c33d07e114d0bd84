//! HTTP client with built-in retry logic and error handling.

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::Client;
use std::time::Duration;

use super::retry::{MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, check_retryable};

/// HTTP client with built-in retry logic for network operations.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    retry_delay: Duration,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    ///
    /// Request timeouts are whatever the wrapped client was built with.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Overrides the pause between retry attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Performs a GET request with query parameters and returns the body as text.
    /// Automatically retries on transient errors.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        debug!("GET {} with query {:?}...", url, query);

        self.with_retry("GET", || async {
            let response = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .context("Failed to send request")?;

            let response = response.error_for_status().map_err(check_retryable)?;

            response
                .text()
                .await
                .context("Failed to read response body")
        })
        .await
    }

    /// Executes an async operation with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_retryable_error(&e) {
                        debug!("{}: non-retryable error: {}", operation_name, e);
                        return Err(e);
                    }

                    if attempt < MAX_RETRIES {
                        warn!(
                            "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                            operation_name,
                            attempt,
                            MAX_RETRIES,
                            e,
                            self.retry_delay.as_millis()
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            anyhow::anyhow!("{}: failed after {} attempts", operation_name, MAX_RETRIES)
        }))
    }
}

/// Checks if an anyhow::Error is retryable based on its content.
fn is_retryable_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_client() -> HttpClient {
        HttpClient::new(Client::new()).with_retry_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_get_text_success() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/page?id=42")
            .with_status(200)
            .with_body("<html>hello</html>")
            .create_async()
            .await;

        let body = fast_client()
            .get_text(&format!("{}/page", url), &[("id", "42")])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, "<html>hello</html>");
    }

    #[tokio::test]
    async fn test_get_text_not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/page")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let result = fast_client()
            .get_text(&format!("{}/page", url), &[])
            .await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<NonRetryableError>().is_some());
    }

    #[tokio::test]
    async fn test_get_text_server_error_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/page")
            .with_status(503)
            .expect(MAX_RETRIES)
            .create_async()
            .await;

        let result = fast_client()
            .get_text(&format!("{}/page", url), &[])
            .await;

        mock.assert_async().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_text_times_out() {
        let client = Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        let client = HttpClient::new(client).with_retry_delay(Duration::from_millis(1));

        // Nothing listens on port 9 on loopback in CI; either a refused connection
        // or a timeout must surface as an error rather than hang.
        let result = client.get_text("http://127.0.0.1:9/page", &[]).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_is_retryable_error() {
        let err = anyhow::Error::from(NonRetryableError::NotFound("test".to_string()));
        assert!(!is_retryable_error(&err));

        let err = anyhow::anyhow!("connection reset by peer");
        assert!(is_retryable_error(&err));
    }

    #[tokio::test]
    async fn test_with_retry_retries_then_succeeds() {
        let client = fast_client();
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let result = client
            .with_retry("test", || {
                let count = call_count_clone.clone();
                async move {
                    let current = count.fetch_add(1, Ordering::SeqCst);
                    if current < 2 {
                        Err::<&str, _>(anyhow::anyhow!("connection reset"))
                    } else {
                        Ok("success after retries")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "success after retries");
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_non_retryable() {
        let client = fast_client();
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let result = client
            .with_retry("test", || {
                let count = call_count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(anyhow::Error::from(NonRetryableError::NotFound(
                        "not found".to_string(),
                    )))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
