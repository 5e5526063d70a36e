//! Account, project, and subscription usage models returned by `GET /account`.
//!
//! The API adds fields over time, so every field is defaulted and unknown
//! fields are ignored rather than failing deserialization.

use serde::Deserialize;
use serde_json::Value;

/// Full account details for the API key in use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub account: AccountProfile,
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub subscription: Subscription,
}

impl Account {
    /// Maximum simultaneous scrapes the subscription currently allows.
    #[must_use]
    pub fn concurrent_limit(&self) -> usize {
        self.subscription.usage.scrape.concurrent_limit
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountProfile {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub timezone: String,
}

/// Per-project quota and settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub allow_extra_usage: bool,
    #[serde(default)]
    pub allowed_networks: Vec<String>,
    #[serde(default)]
    pub budget_limit: Value,
    #[serde(default)]
    pub budget_spent: Value,
    /// Project-level override of the subscription concurrency.
    #[serde(default)]
    pub concurrency_limit: Option<usize>,
    #[serde(default)]
    pub quota_reached: bool,
    #[serde(default)]
    pub scrape_request_count: u64,
    #[serde(default)]
    pub scrape_request_limit: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub plan_name: String,
    #[serde(default)]
    pub extra_scrape_allowed: bool,
    #[serde(default)]
    pub max_concurrency: usize,
    #[serde(default)]
    pub period: BillingPeriod,
    #[serde(default)]
    pub billing: Value,
    #[serde(default)]
    pub usage: SubscriptionUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingPeriod {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionUsage {
    #[serde(default)]
    pub scrape: ScrapeUsage,
    #[serde(default)]
    pub schedule: CounterUsage,
    #[serde(default)]
    pub spider: CounterUsage,
}

/// Scrape-specific usage counters, including the concurrency ceiling the
/// dispatcher resolves when no explicit limit is given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScrapeUsage {
    #[serde(default)]
    pub concurrent_limit: usize,
    #[serde(default)]
    pub concurrent_remaining: usize,
    #[serde(default)]
    pub concurrent_usage: usize,
    #[serde(default)]
    pub current: u64,
    #[serde(default)]
    pub extra: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub remaining: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CounterUsage {
    #[serde(default)]
    pub current: u64,
    #[serde(default)]
    pub limit: u64,
}

#[cfg(test)]
mod tests {
    use super::Account;

    #[test]
    fn deserializes_full_account_payload() {
        let payload = serde_json::json!({
            "account": {
                "account_id": "aaa-bbb",
                "currency": "USD",
                "timezone": "Europe/Paris"
            },
            "project": {
                "name": "default",
                "allow_extra_usage": true,
                "allowed_networks": [],
                "budget_limit": null,
                "budget_spent": null,
                "quota_reached": false,
                "scrape_request_count": 42,
                "scrape_request_limit": 100_000,
                "tags": ["kind:default"]
            },
            "subscription": {
                "plan_name": "PRO",
                "extra_scrape_allowed": true,
                "max_concurrency": 20,
                "period": { "start": "2024-01-01", "end": "2024-02-01" },
                "usage": {
                    "schedule": { "current": 0, "limit": 10 },
                    "spider": { "current": 0, "limit": 10 },
                    "scrape": {
                        "concurrent_limit": 5,
                        "concurrent_remaining": 5,
                        "concurrent_usage": 0,
                        "current": 42,
                        "extra": 0,
                        "limit": 100_000,
                        "remaining": 99_958
                    }
                }
            }
        });

        let account: Account = serde_json::from_value(payload).expect("valid account payload");
        assert_eq!(account.account.account_id, "aaa-bbb");
        assert_eq!(account.subscription.plan_name, "PRO");
        assert_eq!(account.concurrent_limit(), 5);
        assert_eq!(account.subscription.usage.scrape.remaining, 99_958);
    }

    #[test]
    fn tolerates_missing_and_unknown_fields() {
        let payload = serde_json::json!({
            "subscription": {
                "usage": { "scrape": { "concurrent_limit": 3 } },
                "brand_new_field": { "nested": true }
            }
        });

        let account: Account = serde_json::from_value(payload).expect("partial payload");
        assert_eq!(account.concurrent_limit(), 3);
        assert_eq!(account.project.scrape_request_count, 0);
    }
}
