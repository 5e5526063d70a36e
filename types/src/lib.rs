//! Typed payloads for the Scrapfly API.
//!
//! This crate contains the wire models returned by the scrape, account,
//! screenshot, and extraction endpoints. Everything here is pure data with
//! no IO and no async, so it can be shared between the client and the
//! webhook receiver.

mod account;
mod result;

pub use account::{
    Account, AccountProfile, BillingPeriod, CounterUsage, Project, ScrapeUsage, Subscription,
    SubscriptionUsage,
};
pub use result::{
    ContentTypeError, ExtractionResult, ResultData, ResultError, ScrapeResult, ScreenshotMetadata,
    ScreenshotResult,
};

// Callers query the parsed documents with scraper's own selector types,
// so the crate is part of the public API.
pub use scraper;
