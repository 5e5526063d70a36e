//! Webhook receiver for Scrapfly result delivery.
//!
//! Scrape and extraction jobs configured with a webhook deliver their
//! results by POSTing to a registered endpoint instead of the API
//! response. This crate provides the receiving side: signature
//! verification against the account's signing secret and an [`axum`]
//! router that decodes deliveries into [`WebhookEvent`]s for a caller
//! supplied handler.
//!
//! ```ignore
//! let receiver = WebhookReceiver::new(|event: WebhookEvent| async move {
//!     if let Some(result) = event.scrape_result() {
//!         println!("scraped {}", result.result.url);
//!     }
//!     Ok::<_, std::convert::Infallible>(())
//! })
//! .with_signing_secret(std::env::var("SCRAPFLY_WEBHOOK_SECRET")?);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, receiver.router()).await?;
//! ```

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use hmac::{Hmac, Mac};
use scrapfly_types::ScrapeResult;
use serde_json::{Value, json};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const RESOURCE_TYPE_HEADER: &str = "x-scrapfly-webhook-resource-type";
const SIGNATURE_HEADER: &str = "x-scrapfly-webhook-signature";

/// Signature verification failure.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook signing secret is not valid hex")]
    InvalidSecret(#[source] hex::FromHexError),
    #[error("webhook signature does not match the payload")]
    SignatureMismatch,
}

/// What a delivery announces itself as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    /// A finished scrape job carrying its envelope.
    Scrape,
    /// A connectivity check with an arbitrary payload.
    Ping,
}

impl ResourceType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Scrape => "scrape",
            ResourceType::Ping => "ping",
        }
    }
}

/// Resource type header value this receiver does not handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported webhook resource type: {0}")]
pub struct UnknownResourceType(String);

impl FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scrape" => Ok(ResourceType::Scrape),
            "ping" => Ok(ResourceType::Ping),
            other => Err(UnknownResourceType(other.to_string())),
        }
    }
}

/// One decoded webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    pub resource_type: ResourceType,
    /// Raw delivery payload. For scrape deliveries this is the envelope.
    pub payload: Value,
}

impl WebhookEvent {
    /// Decode the payload as a scrape envelope.
    ///
    /// Returns `None` for ping deliveries and for payloads that do not
    /// carry an envelope.
    #[must_use]
    pub fn scrape_result(&self) -> Option<ScrapeResult> {
        if self.resource_type != ResourceType::Scrape {
            return None;
        }
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// Verify a delivery against the account's webhook signing secret.
///
/// The secret is the hex string shown in the dashboard; the signature is
/// the hex HMAC-SHA256 of the raw request body, compared in constant
/// time and case-insensitively.
pub fn verify_signature(
    body: &[u8],
    signature: &str,
    signing_secret: &str,
) -> Result<(), WebhookError> {
    let secret = hex::decode(signing_secret).map_err(WebhookError::InvalidSecret)?;
    let provided = hex::decode(signature).map_err(|_| WebhookError::SignatureMismatch)?;
    let mut mac = HmacSha256::new_from_slice(&secret).expect("HMAC accepts any key length");
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| WebhookError::SignatureMismatch)
}

type HandlerFn =
    Arc<dyn Fn(WebhookEvent) -> BoxFuture<'static, Result<(), axum::BoxError>> + Send + Sync>;

/// Receives Scrapfly webhook deliveries and hands them to a callback.
///
/// With a signing secret configured, deliveries whose signature header
/// does not match the body are rejected with 401 before the callback
/// runs. Without one, every well-formed delivery is handed over.
#[derive(Clone)]
pub struct WebhookReceiver {
    signing_secret: Option<String>,
    callback: HandlerFn,
}

impl WebhookReceiver {
    pub fn new<F, Fut, E>(callback: F) -> Self
    where
        F: Fn(WebhookEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<axum::BoxError>,
    {
        Self {
            signing_secret: None,
            callback: Arc::new(move |event| {
                let handled = callback(event);
                async move { handled.await.map_err(Into::into) }.boxed()
            }),
        }
    }

    /// Require deliveries to be signed with this hex secret.
    #[must_use]
    pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    /// Router exposing `POST /webhook`.
    ///
    /// Responds 200 with `{"success": true}` on a handled delivery, 400
    /// on an unsupported resource type or malformed payload, 401 on a
    /// signature mismatch, and 500 when the callback fails.
    #[must_use]
    pub fn router(self) -> Router {
        Router::new()
            .route("/webhook", post(receive))
            .with_state(self)
    }
}

impl std::fmt::Debug for WebhookReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookReceiver")
            .field("signed", &self.signing_secret.is_some())
            .finish_non_exhaustive()
    }
}

async fn receive(
    State(receiver): State<WebhookReceiver>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let announced = headers
        .get(RESOURCE_TYPE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let Ok(resource_type) = announced.parse::<ResourceType>() else {
        tracing::error!(resource_type = announced, "unsupported webhook resource type");
        return (
            StatusCode::BAD_REQUEST,
            "only scrape and ping webhooks are supported",
        )
            .into_response();
    };

    if let Some(secret) = &receiver.signing_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if let Err(error) = verify_signature(&body, signature, secret) {
            tracing::error!(%error, "webhook delivery rejected");
            return (StatusCode::UNAUTHORIZED, "invalid webhook signature").into_response();
        }
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(error) => {
            tracing::error!(%error, "webhook payload is not valid JSON");
            return (StatusCode::BAD_REQUEST, "payload must be JSON").into_response();
        }
    };

    let event = WebhookEvent {
        resource_type,
        payload,
    };
    tracing::debug!(resource_type = resource_type.as_str(), "webhook delivery received");
    match (receiver.callback)(event).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(error) => {
            tracing::error!(%error, "webhook callback failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
