//! Transport-level retries.
//!
//! The API asks clients to retry server-side failures after a short fixed
//! delay. Only 5xx responses and network failures qualify; 4xx responses
//! are final and flow to classification unchanged.

use std::time::Duration;

/// Retry policy for a single API request.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first request.
    pub max_retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Send a request, retrying on 5xx responses and network failures.
///
/// Returns the final response whatever its status; callers classify the
/// body afterwards. Builder errors are never retried since rebuilding the
/// same request cannot fix them.
pub(crate) async fn send_with_retry<F>(
    build_request: F,
    config: &RetryConfig,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt: u32 = 0;
    loop {
        let result = build_request().send().await;
        let retryable = match &result {
            Ok(response) => response.status().is_server_error(),
            Err(error) => !error.is_builder(),
        };
        if !retryable || attempt >= config.max_retries {
            return result;
        }
        attempt += 1;
        match &result {
            Ok(response) => tracing::debug!(
                status = response.status().as_u16(),
                attempt,
                max_retries = config.max_retries,
                "retrying after server error"
            ),
            Err(error) => tracing::debug!(
                error = %error,
                attempt,
                max_retries = config.max_retries,
                "retrying after transport error"
            ),
        }
        tokio::time::sleep(config.retry_delay).await;
    }
}
