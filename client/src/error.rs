//! Error taxonomy for the Scrapfly API.
//!
//! Two families exist: configuration errors raised before any network call,
//! and API errors classified from response payloads. The concurrent
//! dispatcher surfaces per-job errors as in-band stream items, so callers
//! can partition outcomes without wrapping iteration in error handling.

use std::fmt;

use scrapfly_types::{ContentTypeError, ScrapeResult};
use serde_json::Value;
use thiserror::Error;

/// Documentation link attached when the API reports none.
const DEFAULT_DOC_URL: &str = "https://scrapfly.io/docs/scrape-api/errors#api";

/// Invalid or mutually exclusive scrape options, detected before any request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScrapeConfigError {
    message: String,
}

impl ScrapeConfigError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Invalid or mutually exclusive extraction options, detected before any request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExtractionConfigError {
    message: String,
}

impl ExtractionConfigError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Structured context the API attaches to a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiErrorDetail {
    /// Dotted status code, e.g. `ERR::ASP::SHIELD_ERROR`.
    pub code: Option<String>,
    /// HTTP status the API associates with the failure. For upstream
    /// failures this is the target site's status code.
    pub http_status: Option<u16>,
    /// Whether the API marked the failure as retryable.
    pub retryable: bool,
    /// Link to the matching error documentation.
    pub doc_url: String,
}

impl fmt::Display for ApiErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code={}", self.code.as_deref().unwrap_or("-"))?;
        if let Some(status) = self.http_status {
            write!(f, " http_status={status}")?;
        }
        write!(f, " retryable={}", self.retryable)
    }
}

/// Every failure the SDK can produce.
///
/// Resource-scoped variants mirror the subsystem segment of dotted status
/// codes (`ERR::<RESOURCE>::<code>`) so callers can branch on the failure
/// domain. Upstream variants indicate the scraped site itself failed, split
/// by the site's own status class.
#[derive(Debug, Error)]
pub enum ScrapflyError {
    #[error(transparent)]
    ScrapeConfig(#[from] ScrapeConfigError),

    #[error(transparent)]
    ExtractionConfig(#[from] ExtractionConfigError),

    #[error(transparent)]
    ContentType(#[from] ContentTypeError),

    /// Invalid or missing API key.
    #[error("bad API key: {message}")]
    BadApiKey { message: String },

    /// Account concurrency or throttle limit hit.
    #[error("too many requests: {message} [{detail}]")]
    TooManyRequests {
        message: String,
        detail: ApiErrorDetail,
    },

    /// The API rejected the request (4xx-class status).
    #[error("API client error: {message} [{detail}]")]
    ApiHttpClient {
        message: String,
        detail: ApiErrorDetail,
    },

    /// The API itself failed (5xx-class status).
    #[error("API server error: {message} [{detail}]")]
    ApiHttpServer {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Scrape subsystem failure.
    #[error("scrape failed: {message} [{detail}]")]
    Scrape {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Webhook subsystem failure.
    #[error("webhook failed: {message} [{detail}]")]
    Webhook {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Proxy layer failure.
    #[error("proxy failed: {message} [{detail}]")]
    Proxy {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Scheduling layer failure.
    #[error("schedule failed: {message} [{detail}]")]
    Schedule {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Anti-scraping-protection layer failure.
    #[error("anti scraping protection failed: {message} [{detail}]")]
    Asp {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Session layer failure.
    #[error("session failed: {message} [{detail}]")]
    Session {
        message: String,
        detail: ApiErrorDetail,
    },

    /// The scraped site answered with a 4xx-class status.
    #[error("upstream client error: {message} [{detail}]")]
    UpstreamHttpClient {
        message: String,
        detail: ApiErrorDetail,
    },

    /// The scraped site answered with a 5xx-class status.
    #[error("upstream server error: {message} [{detail}]")]
    UpstreamHttpServer {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Screenshot endpoint failure.
    #[error("screenshot API error: {message} [{detail}]")]
    ScreenshotApi {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Extraction endpoint failure.
    #[error("extraction API error: {message} [{detail}]")]
    ExtractionApi {
        message: String,
        detail: ApiErrorDetail,
    },

    /// API failure that matches no known classification.
    #[error("API error: {message} [{detail}]")]
    Other {
        message: String,
        detail: ApiErrorDetail,
    },

    /// Network-level failure after the transport exhausted its retries.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a payload the SDK cannot decode.
    #[error("unexpected API payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ScrapflyError {
    /// Structured API context, when this error came from an API response.
    #[must_use]
    pub fn detail(&self) -> Option<&ApiErrorDetail> {
        match self {
            ScrapflyError::TooManyRequests { detail, .. }
            | ScrapflyError::ApiHttpClient { detail, .. }
            | ScrapflyError::ApiHttpServer { detail, .. }
            | ScrapflyError::Scrape { detail, .. }
            | ScrapflyError::Webhook { detail, .. }
            | ScrapflyError::Proxy { detail, .. }
            | ScrapflyError::Schedule { detail, .. }
            | ScrapflyError::Asp { detail, .. }
            | ScrapflyError::Session { detail, .. }
            | ScrapflyError::UpstreamHttpClient { detail, .. }
            | ScrapflyError::UpstreamHttpServer { detail, .. }
            | ScrapflyError::ScreenshotApi { detail, .. }
            | ScrapflyError::ExtractionApi { detail, .. }
            | ScrapflyError::Other { detail, .. } => Some(detail),
            _ => None,
        }
    }

    /// Classify a scrape envelope whose result is not a success.
    ///
    /// The API reports failures on two axes: `success` tells whether the API
    /// handled the request, and the dotted `status` code names the failing
    /// subsystem. `BAD_UPSTREAM_RESPONSE` failures are split by the target
    /// site's status class instead.
    pub(crate) fn from_scrape_envelope(envelope: &ScrapeResult) -> Self {
        let result = &envelope.result;
        let error = result.error.clone().unwrap_or_default();
        let message = error.message.unwrap_or_default();
        let detail = ApiErrorDetail {
            code: (!result.status.is_empty()).then(|| result.status.clone()),
            http_status: Some(result.status_code),
            retryable: error.retryable,
            doc_url: error
                .doc_url
                .unwrap_or_else(|| DEFAULT_DOC_URL.to_string()),
        };
        let resource = result.status.split("::").nth(1);

        if result.success {
            if result.status_code >= 500 {
                return ScrapflyError::ApiHttpServer { message, detail };
            }
            match result.status_code {
                401 => return ScrapflyError::BadApiKey { message },
                429 => return ScrapflyError::TooManyRequests { message, detail },
                _ => {}
            }
            if let Some(found) = resource.and_then(|r| Self::resource_error(r, &message, &detail))
            {
                return found;
            }
            ScrapflyError::ApiHttpClient { message, detail }
        } else {
            if result.status == "ERR::SCRAPE::BAD_UPSTREAM_RESPONSE" {
                if result.status_code >= 500 {
                    return ScrapflyError::UpstreamHttpServer { message, detail };
                }
                if result.status_code >= 400 {
                    return ScrapflyError::UpstreamHttpClient { message, detail };
                }
            }
            if let Some(found) = resource.and_then(|r| Self::resource_error(r, &message, &detail))
            {
                return found;
            }
            ScrapflyError::Other { message, detail }
        }
    }

    /// Classify a bare error document, the shape returned outside scrape
    /// envelopes (account lookups, screenshot and extraction failures, and
    /// key-level rejections).
    pub(crate) fn from_error_document(status: reqwest::StatusCode, payload: &Value) -> Self {
        let reported = payload
            .get("http_code")
            .and_then(Value::as_u64)
            .map(|code| code as u16);
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| payload.to_string());
        let detail = ApiErrorDetail {
            code: payload
                .get("code")
                .and_then(Value::as_str)
                .map(str::to_string),
            http_status: reported.or(Some(status.as_u16())),
            retryable: false,
            doc_url: DEFAULT_DOC_URL.to_string(),
        };

        if reported == Some(401) || status.as_u16() == 401 {
            return ScrapflyError::BadApiKey { message };
        }
        if status.as_u16() == 429 {
            return ScrapflyError::TooManyRequests { message, detail };
        }
        if let Some(code) = detail.code.as_deref() {
            if code.starts_with("ERR::SCREENSHOT") {
                return ScrapflyError::ScreenshotApi { message, detail };
            }
            if code.starts_with("ERR::EXTRACTION") {
                return ScrapflyError::ExtractionApi { message, detail };
            }
        }
        if status.is_server_error() {
            ScrapflyError::ApiHttpServer { message, detail }
        } else {
            ScrapflyError::ApiHttpClient { message, detail }
        }
    }

    fn resource_error(resource: &str, message: &str, detail: &ApiErrorDetail) -> Option<Self> {
        let message = message.to_string();
        let detail = detail.clone();
        let error = match resource {
            "SCRAPE" => ScrapflyError::Scrape { message, detail },
            "WEBHOOK" => ScrapflyError::Webhook { message, detail },
            "PROXY" => ScrapflyError::Proxy { message, detail },
            "SCHEDULE" => ScrapflyError::Schedule { message, detail },
            "ASP" => ScrapflyError::Asp { message, detail },
            "SESSION" => ScrapflyError::Session { message, detail },
            _ => return None,
        };
        Some(error)
    }
}

/// An API error wrapper rather than a scrape envelope: it carries an
/// `error_id` (or nothing at all).
pub(crate) fn is_error_document(payload: &Value) -> bool {
    payload.get("error_id").is_some() || payload.as_object().is_some_and(|map| map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{ScrapflyError, is_error_document};
    use scrapfly_types::ScrapeResult;

    fn envelope(status: &str, status_code: u16, success: bool) -> ScrapeResult {
        serde_json::from_value(serde_json::json!({
            "config": {},
            "context": {},
            "uuid": "1234",
            "result": {
                "status": status,
                "status_code": status_code,
                "success": success,
                "error": {
                    "code": status,
                    "http_code": status_code,
                    "message": "failed",
                    "retryable": false
                }
            }
        }))
        .expect("valid envelope")
    }

    #[test]
    fn server_status_with_api_success_is_a_server_error() {
        let error = ScrapflyError::from_scrape_envelope(&envelope("DONE", 500, true));
        assert!(matches!(error, ScrapflyError::ApiHttpServer { .. }));
    }

    #[test]
    fn status_401_with_api_success_is_bad_api_key() {
        let error = ScrapflyError::from_scrape_envelope(&envelope("DONE", 401, true));
        assert!(matches!(error, ScrapflyError::BadApiKey { .. }));
    }

    #[test]
    fn status_429_with_api_success_is_rate_limit() {
        let error = ScrapflyError::from_scrape_envelope(&envelope("DONE", 429, true));
        assert!(matches!(error, ScrapflyError::TooManyRequests { .. }));
    }

    #[test]
    fn bad_upstream_response_splits_on_target_status() {
        let error = ScrapflyError::from_scrape_envelope(&envelope(
            "ERR::SCRAPE::BAD_UPSTREAM_RESPONSE",
            404,
            false,
        ));
        assert!(matches!(error, ScrapflyError::UpstreamHttpClient { .. }));

        let error = ScrapflyError::from_scrape_envelope(&envelope(
            "ERR::SCRAPE::BAD_UPSTREAM_RESPONSE",
            503,
            false,
        ));
        assert!(matches!(error, ScrapflyError::UpstreamHttpServer { .. }));
    }

    #[test]
    fn dotted_codes_map_to_resource_errors() {
        let cases = [
            ("ERR::SCRAPE::OPERATION_TIMEOUT", "scrape"),
            ("ERR::WEBHOOK::DISABLED", "webhook"),
            ("ERR::PROXY::POOL_NOT_FOUND", "proxy"),
            ("ERR::SCHEDULE::DISABLED", "schedule"),
            ("ERR::ASP::SHIELD_ERROR", "asp"),
            ("ERR::SESSION::CONCURRENT_ACCESS", "session"),
        ];
        for (code, expected) in cases {
            let error = ScrapflyError::from_scrape_envelope(&envelope(code, 422, false));
            let matched = match (&error, expected) {
                (ScrapflyError::Scrape { .. }, "scrape")
                | (ScrapflyError::Webhook { .. }, "webhook")
                | (ScrapflyError::Proxy { .. }, "proxy")
                | (ScrapflyError::Schedule { .. }, "schedule")
                | (ScrapflyError::Asp { .. }, "asp")
                | (ScrapflyError::Session { .. }, "session") => true,
                _ => false,
            };
            assert!(matched, "{code} mapped to {error:?}");
        }
    }

    #[test]
    fn unknown_failure_with_api_success_is_a_client_error() {
        let error = ScrapflyError::from_scrape_envelope(&envelope("ERR::NEW::THING", 422, true));
        assert!(matches!(error, ScrapflyError::ApiHttpClient { .. }));
    }

    #[test]
    fn unknown_failure_without_api_success_is_unclassified() {
        let error = ScrapflyError::from_scrape_envelope(&envelope("ERR::NEW::THING", 422, false));
        assert!(matches!(error, ScrapflyError::Other { .. }));
    }

    #[test]
    fn detail_carries_code_and_doc_url() {
        let error = ScrapflyError::from_scrape_envelope(&envelope("ERR::ASP::SHIELD_ERROR", 422, false));
        let detail = error.detail().expect("api error carries detail");
        assert_eq!(detail.code.as_deref(), Some("ERR::ASP::SHIELD_ERROR"));
        assert_eq!(detail.http_status, Some(422));
        assert!(detail.doc_url.starts_with("https://scrapfly.io/docs"));
    }

    #[test]
    fn error_documents_are_recognized() {
        assert!(is_error_document(&serde_json::json!({
            "error_id": "301e2d9e-b4f5-4289-85ea-e452143338df",
            "http_code": 401
        })));
        assert!(is_error_document(&serde_json::json!({})));
        assert!(!is_error_document(&serde_json::json!({
            "result": { "status": "DONE" }
        })));
    }

    #[test]
    fn error_document_with_401_is_bad_api_key() {
        let payload = serde_json::json!({
            "code": "ERR::AUTH::INVALID_KEY",
            "error_id": "301e2d9e",
            "http_code": 401,
            "message": "Invalid API key"
        });
        let error = ScrapflyError::from_error_document(reqwest::StatusCode::UNAUTHORIZED, &payload);
        assert!(matches!(error, ScrapflyError::BadApiKey { .. }));
    }

    #[test]
    fn error_document_routes_screenshot_and_extraction_codes() {
        let payload = serde_json::json!({
            "code": "ERR::SCREENSHOT::UNABLE_TO_TAKE_SCREENSHOT",
            "error_id": "301e2d9e",
            "http_code": 422,
            "message": "could not screenshot"
        });
        let error =
            ScrapflyError::from_error_document(reqwest::StatusCode::UNPROCESSABLE_ENTITY, &payload);
        assert!(matches!(error, ScrapflyError::ScreenshotApi { .. }));

        let payload = serde_json::json!({
            "code": "ERR::EXTRACTION::CONTENT_TYPE_NOT_SUPPORTED",
            "error_id": "301e2d9e",
            "http_code": 422,
            "message": "unsupported content type"
        });
        let error =
            ScrapflyError::from_error_document(reqwest::StatusCode::UNPROCESSABLE_ENTITY, &payload);
        assert!(matches!(error, ScrapflyError::ExtractionApi { .. }));
    }
}
