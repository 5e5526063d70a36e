//! Integration tests for the webhook delivery endpoint.

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use hmac::{Hmac, Mac};
use http_body_util::BodyExt;
use scrapfly_webhook::{ResourceType, WebhookEvent, WebhookReceiver};
use serde_json::{Value, json};
use sha2::Sha256;
use tower::ServiceExt;

/// Hex signing secret as shown in the dashboard ("mock_signing_secret").
const SECRET: &str = "6d6f636b5f7369676e696e675f736563726574";

fn recording_receiver() -> (WebhookReceiver, Arc<Mutex<Vec<WebhookEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let receiver = WebhookReceiver::new(move |event| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push(event);
            Ok::<_, Infallible>(())
        }
    });
    (receiver, seen)
}

fn delivery(resource_type: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("x-scrapfly-webhook-resource-type", resource_type)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn signed_delivery(resource_type: &str, body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header("x-scrapfly-webhook-resource-type", resource_type)
        .header("x-scrapfly-webhook-signature", signature)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn sign(body: &[u8]) -> String {
    let secret = hex::decode(SECRET).unwrap();
    let mut mac = Hmac::<Sha256>::new_from_slice(&secret).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn a_ping_delivery_reaches_the_callback() {
    let (receiver, seen) = recording_receiver();
    let app = receiver.router();

    let response = app
        .oneshot(delivery("ping", r#"{"message":"hello"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "success": true }));

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].resource_type, ResourceType::Ping);
    assert_eq!(events[0].payload["message"], "hello");
}

#[tokio::test]
async fn scrape_deliveries_decode_into_envelopes() {
    let (receiver, seen) = recording_receiver();
    let app = receiver.router();

    let envelope = json!({
        "config": {},
        "context": {},
        "uuid": "0b5f7a55",
        "result": {
            "content": "<html><body><h1>Product</h1></body></html>",
            "status": "DONE",
            "status_code": 200,
            "success": true,
            "response_headers": { "content-type": "text/html; charset=utf-8" }
        }
    });
    let response = app
        .oneshot(delivery("scrape", &envelope.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let events = seen.lock().unwrap();
    let result = events[0].scrape_result().expect("envelope decodes");
    assert_eq!(result.uuid, "0b5f7a55");
    assert!(result.result.success);
}

#[tokio::test]
async fn unknown_resource_types_are_rejected() {
    let (receiver, seen) = recording_receiver();
    let app = receiver.router();

    let response = app.oneshot(delivery("spider", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_payloads_are_rejected() {
    let (receiver, seen) = recording_receiver();
    let app = receiver.router();

    let response = app.oneshot(delivery("ping", "not json")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn signed_deliveries_require_a_matching_signature() {
    let (receiver, seen) = recording_receiver();
    let app = receiver.with_signing_secret(SECRET).router();

    // The dashboard shows signatures in uppercase hex; verification is
    // case-insensitive.
    let body = r#"{"message":"hello"}"#;
    let signature = sign(body.as_bytes()).to_uppercase();
    let response = app
        .oneshot(signed_delivery("ping", body, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn tampered_deliveries_are_rejected() {
    let (receiver, seen) = recording_receiver();
    let app = receiver.with_signing_secret(SECRET).router();

    let signature = sign(br#"{"message":"hello"}"#);
    let response = app
        .oneshot(signed_delivery("ping", r#"{"message":"tampered"}"#, &signature))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unsigned_deliveries_are_rejected_when_a_secret_is_configured() {
    let (receiver, seen) = recording_receiver();
    let app = receiver.with_signing_secret(SECRET).router();

    let response = app.oneshot(delivery("ping", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn callback_failures_surface_as_server_errors() {
    let receiver = WebhookReceiver::new(|_event| async {
        Err::<(), axum::BoxError>("downstream store unavailable".into())
    });
    let app = receiver.router();

    let response = app.oneshot(delivery("ping", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
