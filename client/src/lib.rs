//! Async client for the Scrapfly web scraping API.
//!
//! # Architecture
//!
//! The crate is organized around one client and per-endpoint configs:
//!
//! - [`ScrapflyClient`] - HTTP client holding the API key, host, and retry policy
//! - [`ScrapeConfig`] / [`ScrapflyClient::scrape`] - scrape a URL through the API
//! - [`ScreenshotConfig`] / [`ScrapflyClient::screenshot`] - capture a rendered page
//! - [`ExtractionConfig`] / [`ScrapflyClient::extract`] - extract data from a document
//! - [`ScrapflyClient::concurrent_scrape`] - run many scrapes under a concurrency cap
//!
//! Configs render themselves to query parameters; the client owns transport,
//! retries, and error classification. Payload types live in [`scrapfly_types`]
//! and are re-exported here.
//!
//! # Error Handling
//!
//! Failures reported inside an HTTP 200 envelope and bare error documents
//! both classify into [`ScrapflyError`], so callers match on one taxonomy
//! regardless of how the API chose to deliver the failure. Transport-level
//! retries happen below classification: 5xx responses and network errors
//! are retried a few times with a fixed delay, 4xx responses never.
//!
//! # Quick Start
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use scrapfly_client::{ScrapeConfig, ScrapflyClient};
//!
//! let client = ScrapflyClient::new(std::env::var("SCRAPFLY_KEY")?)?;
//! let configs = vec![
//!     ScrapeConfig::new("https://web-scraping.dev/product/1").with_asp(true),
//!     ScrapeConfig::new("https://web-scraping.dev/product/2").with_asp(true),
//! ];
//! // Concurrency defaults to the account's allowance.
//! let mut jobs = client.concurrent_scrape(configs, None).await?;
//! while let Some(outcome) = jobs.next().await {
//!     println!("{:?}", outcome.map(|r| r.result.status_code));
//! }
//! ```

mod concurrent;
mod error;
mod extraction;
mod retry;
mod scrape;
mod screenshot;

use std::num::NonZeroUsize;
use std::time::Duration;

use futures_util::FutureExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;

pub use concurrent::{ConcurrentScrape, ScrapeOutcome};
pub use error::{ApiErrorDetail, ExtractionConfigError, ScrapeConfigError, ScrapflyError};
pub use extraction::{CompressionFormat, ExtractionConfig};
pub use retry::RetryConfig;
pub use scrape::{
    ContentFormat, PUBLIC_DATACENTER_POOL, PUBLIC_RESIDENTIAL_POOL, ScrapeConfig, ScreenshotFlag,
};
pub use screenshot::{ScreenshotConfig, ScreenshotFormat, ScreenshotOption};

pub use scrapfly_types;
pub use scrapfly_types::{
    Account, ContentTypeError, ExtractionResult, ScrapeResult, ScreenshotMetadata,
    ScreenshotResult,
};

/// Production API host.
pub const DEFAULT_HOST: &str = "https://api.scrapfly.io";

// Scrape jobs can legitimately run for minutes when rendering and retrying
// upstream, so the transport timeout is generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(160);
const USER_AGENT: &str = "Rust Scrapfly SDK";

/// Scrapfly API client.
///
/// Cheap to clone and safe to share: all methods take `&self`, so one
/// client can serve many tasks at once.
#[derive(Clone)]
pub struct ScrapflyClient {
    host: String,
    key: String,
    http: reqwest::Client,
    retry: RetryConfig,
}

impl std::fmt::Debug for ScrapflyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapflyClient")
            .field("host", &self.host)
            .field("key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl ScrapflyClient {
    /// Build a client for the production API.
    ///
    /// Fails on an empty key or when the TLS backend cannot initialize.
    pub fn new(key: impl Into<String>) -> Result<Self, ScrapflyError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ScrapflyError::BadApiKey {
                message: "API key must not be empty".to_string(),
            });
        }
        let mut default_headers = HeaderMap::new();
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(default_headers)
            .build()?;
        Ok(Self {
            host: DEFAULT_HOST.to_string(),
            key,
            http,
            retry: RetryConfig::default(),
        })
    }

    /// Point the client at a different host, e.g. a test server.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the transport retry policy.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Fetch the account state: subscription, quotas, and concurrency
    /// allowance.
    pub async fn account(&self) -> Result<Account, ScrapflyError> {
        let url = format!("{}/account", self.host);
        tracing::debug!("fetching account state");
        let response = retry::send_with_retry(
            || self.http.get(&url).query(&[("key", self.key.as_str())]),
            &self.retry,
        )
        .await?;
        let status = response.status();
        let payload: Value = response.json().await?;
        if status != reqwest::StatusCode::OK || error::is_error_document(&payload) {
            return Err(ScrapflyError::from_error_document(status, &payload));
        }
        Ok(serde_json::from_value(payload)?)
    }

    /// Scrape one URL through the API.
    ///
    /// Returns the full envelope on success and a classified
    /// [`ScrapflyError`] when the API, the scrape, or the target failed.
    pub async fn scrape(&self, config: ScrapeConfig) -> Result<ScrapeResult, ScrapflyError> {
        let params = config.to_api_params(&self.key)?;
        let (headers, body) = config.prepared_headers_and_body()?;
        let content_type = match (&body, headers.get("content-type")) {
            (Some(_), Some(declared)) => declared.clone(),
            _ => "application/json".to_string(),
        };
        let url = format!("{}/scrape", self.host);
        tracing::debug!(url = config.url(), method = %config.method(), "scraping");

        let response = retry::send_with_retry(
            || {
                let mut request = self
                    .http
                    .request(config.method().clone(), &url)
                    .query(&params)
                    .header(header::CONTENT_TYPE, &content_type);
                if let Some(body) = &body {
                    request = request.body(body.clone());
                }
                request
            },
            &self.retry,
        )
        .await?;

        let status = response.status();
        let payload: Value = response.json().await?;
        if error::is_error_document(&payload) {
            return Err(ScrapflyError::from_error_document(status, &payload));
        }
        let envelope: ScrapeResult = serde_json::from_value(payload)?;
        if envelope.result.status == "DONE" && envelope.result.success {
            Ok(envelope)
        } else {
            Err(ScrapflyError::from_scrape_envelope(&envelope))
        }
    }

    /// Capture a screenshot of a rendered page.
    ///
    /// Success responses carry the binary image; metadata comes from the
    /// response headers. A JSON response means the capture failed and is
    /// classified like any other error document.
    pub async fn screenshot(
        &self,
        config: ScreenshotConfig,
    ) -> Result<ScreenshotResult, ScrapflyError> {
        let params = config.to_api_params(&self.key);
        let url = format!("{}/screenshot", self.host);
        tracing::debug!(url = config.url(), "capturing screenshot");

        let response =
            retry::send_with_retry(|| self.http.get(&url).query(&params), &self.retry).await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !status.is_success() || content_type.contains("application/json") {
            let payload: Value = response.json().await?;
            return Err(ScrapflyError::from_error_document(status, &payload));
        }

        let upstream_status_code = response
            .headers()
            .get("x-scrapfly-upstream-http-code")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(200);
        let upstream_url = response
            .headers()
            .get("x-scrapfly-upstream-url")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let metadata = ScreenshotMetadata {
            extension_name: ScreenshotMetadata::extension_from_content_type(&content_type),
            upstream_status_code,
            upstream_url,
        };
        let image = response.bytes().await?.to_vec();
        Ok(ScreenshotResult { image, metadata })
    }

    /// Extract structured data from a document the caller already has.
    ///
    /// The document is posted as the request body with its declared
    /// content type; the extraction strategy travels in the query string.
    pub async fn extract(
        &self,
        config: ExtractionConfig,
    ) -> Result<ExtractionResult, ScrapflyError> {
        let params = config.to_api_params(&self.key)?;
        let url = format!("{}/extraction", self.host);
        tracing::debug!(content_type = config.content_type(), "extracting");

        let body = config.body().to_vec();
        let response = retry::send_with_retry(
            || {
                self.http
                    .post(&url)
                    .query(&params)
                    .header(header::CONTENT_TYPE, config.content_type())
                    .body(body.clone())
            },
            &self.retry,
        )
        .await?;

        let status = response.status();
        let payload: Value = response.json().await?;
        if !status.is_success() || error::is_error_document(&payload) {
            return Err(ScrapflyError::from_error_document(status, &payload));
        }
        Ok(serde_json::from_value(payload)?)
    }

    /// Scrape many URLs while keeping at most `concurrency_limit` jobs in
    /// flight.
    ///
    /// With no explicit limit the account's concurrency allowance is
    /// fetched once and used instead; an empty job list skips the lookup
    /// and yields an empty stream. Per-job failures arrive as `Err` items,
    /// so one refused target never costs the remaining results. Failing to
    /// resolve the account aborts before any scrape starts.
    pub async fn concurrent_scrape(
        &self,
        configs: Vec<ScrapeConfig>,
        concurrency_limit: Option<NonZeroUsize>,
    ) -> Result<ConcurrentScrape<'_>, ScrapflyError> {
        let limit = match concurrency_limit {
            Some(limit) => limit,
            None if configs.is_empty() => NonZeroUsize::MIN,
            None => {
                let account = self.account().await?;
                let resolved = NonZeroUsize::new(account.concurrent_limit())
                    .unwrap_or(NonZeroUsize::MIN);
                tracing::info!(
                    limit = resolved.get(),
                    "resolved concurrency limit from account"
                );
                resolved
            }
        };
        Ok(ConcurrentScrape::new(
            configs,
            limit,
            Box::new(move |config| self.scrape(config).boxed()),
        ))
    }
}
