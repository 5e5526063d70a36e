//! Scrape, screenshot, and extraction response models.

use std::collections::BTreeMap;

use scraper::Html;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Raised when HTML parsing is requested for a non-HTML payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot use selector on non-html content-type, received: {content_type}")]
pub struct ContentTypeError {
    content_type: String,
}

impl ContentTypeError {
    #[must_use]
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
        }
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// One scrape job's response envelope: the echoed request config, the
/// execution context, and the result payload itself.
///
/// `config` and `context` are kept as raw JSON; their shape is both large
/// and open-ended and nothing in the SDK branches on them.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeResult {
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub context: Value,
    pub result: ResultData,
    #[serde(default)]
    pub uuid: String,
}

impl ScrapeResult {
    /// Parse the scraped content as an HTML document for CSS selection.
    ///
    /// Only `text/html` responses can be parsed; the content type is taken
    /// from the upstream response headers.
    pub fn selector(&self) -> Result<Html, ContentTypeError> {
        let content_type = self
            .result
            .response_headers
            .get("content-type")
            .map(String::as_str)
            .unwrap_or_default();
        if !content_type.contains("text/html") {
            return Err(ContentTypeError::new(content_type));
        }
        Ok(Html::parse_document(&self.result.content))
    }
}

/// The scrape payload: upstream content plus the API's own status report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultData {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_encoding: String,
    #[serde(default)]
    pub content_type: String,
    /// API status, `DONE` on success or a dotted `ERR::` code.
    #[serde(default)]
    pub status: String,
    /// HTTP status the API associates with this result. For upstream
    /// failures this is the target site's status code.
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub error: Option<ResultError>,
    #[serde(default)]
    pub log_url: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub response_headers: BTreeMap<String, String>,
    /// Open-ended sections (cookies, dns, ssl, iframes, browser_data,
    /// screenshots, extraction data) kept as raw JSON.
    #[serde(default)]
    pub cookies: Value,
    #[serde(default)]
    pub dns: Value,
    #[serde(default)]
    pub ssl: Value,
    #[serde(default)]
    pub iframes: Value,
    #[serde(default)]
    pub browser_data: Value,
    #[serde(default)]
    pub screenshots: Value,
    #[serde(default)]
    pub data: Value,
}

/// Error detail the API attaches to a failed result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub http_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub retryable: bool,
    #[serde(default)]
    pub doc_url: Option<String>,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

/// Binary screenshot plus metadata recovered from response headers.
#[derive(Debug, Clone)]
pub struct ScreenshotResult {
    pub image: Vec<u8>,
    pub metadata: ScreenshotMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenshotMetadata {
    /// Image extension derived from the response content type.
    pub extension_name: String,
    pub upstream_status_code: u16,
    pub upstream_url: String,
}

impl ScreenshotMetadata {
    /// Derive the image extension from a content-type header value,
    /// e.g. `image/png; charset=binary` yields `png`.
    #[must_use]
    pub fn extension_from_content_type(content_type: &str) -> String {
        content_type
            .split('/')
            .nth(1)
            .unwrap_or_default()
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

/// Structured data returned by the extraction endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionResult {
    /// Extracted payload; shape depends on the template, prompt, or model.
    pub data: Value,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub data_quality: Option<String>,
}
