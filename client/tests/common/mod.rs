//! Shared fixtures for endpoint tests.

use std::time::Duration;

use scrapfly_client::{RetryConfig, ScrapflyClient};
use serde_json::{Value, json};
use wiremock::MockServer;

pub const KEY: &str = "1234";

/// Client pointed at the mock server with fast transport retries.
pub fn test_client(server: &MockServer) -> ScrapflyClient {
    ScrapflyClient::new(KEY)
        .expect("valid key")
        .with_host(server.uri())
        .with_retry_config(RetryConfig {
            max_retries: 1,
            retry_delay: Duration::from_millis(1),
        })
}

/// Scrape envelope the way the API reports one job.
pub fn envelope(status: &str, status_code: u16, success: bool, content: &str) -> Value {
    json!({
        "config": {},
        "context": {},
        "uuid": "0b5f7a55",
        "result": {
            "status": status,
            "status_code": status_code,
            "success": success,
            "content": content,
            "url": "https://web-scraping.dev/products",
            "response_headers": { "content-type": "text/html; charset=utf-8" },
            "error": if success { Value::Null } else { json!({
                "code": status,
                "http_code": status_code,
                "message": "upstream refused",
                "retryable": false
            }) }
        }
    })
}
