//! Bounded concurrent scraping.
//!
//! [`ConcurrentScrape`] drives many scrape jobs while keeping at most a
//! fixed number in flight. It starts as many jobs as the limit allows,
//! then admits one queued job per completion, so the in-flight count never
//! exceeds `min(limit, jobs)` and the account's concurrency budget is
//! never tripped from inside the SDK.
//!
//! Outcomes stream back in completion order, not submission order. Every
//! job yields exactly one item, and per-job failures arrive in-band as
//! `Err` items rather than ending the stream, so one blocked target does
//! not cost the results of the others.
//!
//! ```ignore
//! let mut jobs = client.concurrent_scrape(configs, None).await?;
//! while let Some(outcome) = jobs.next().await {
//!     match outcome {
//!         Ok(result) => println!("{}", result.result.url),
//!         Err(error) => eprintln!("scrape failed: {error}"),
//!     }
//! }
//! ```

use std::fmt;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::stream::{FusedStream, FuturesUnordered, Stream};
use scrapfly_types::ScrapeResult;

use crate::error::ScrapflyError;
use crate::scrape::ScrapeConfig;

/// What one scrape job produced: the envelope, or the classified failure.
pub type ScrapeOutcome = Result<ScrapeResult, ScrapflyError>;

pub(crate) type JobFuture<'a> = BoxFuture<'a, ScrapeOutcome>;

/// Turns a queued config into its running job.
pub(crate) type LaunchFn<'a> = Box<dyn FnMut(ScrapeConfig) -> JobFuture<'a> + Send + 'a>;

/// Stream of scrape outcomes with a hard cap on jobs in flight.
///
/// Created by [`ScrapflyClient::concurrent_scrape`]. The stream ends once
/// every job has yielded its outcome; with no jobs it ends immediately.
///
/// [`ScrapflyClient::concurrent_scrape`]: crate::ScrapflyClient::concurrent_scrape
pub struct ConcurrentScrape<'a> {
    backlog: std::vec::IntoIter<ScrapeConfig>,
    launch: LaunchFn<'a>,
    in_flight: FuturesUnordered<JobFuture<'a>>,
}

impl<'a> ConcurrentScrape<'a> {
    pub(crate) fn new(
        configs: Vec<ScrapeConfig>,
        limit: NonZeroUsize,
        mut launch: LaunchFn<'a>,
    ) -> Self {
        let total = configs.len();
        let mut backlog = configs.into_iter();
        let in_flight = FuturesUnordered::new();
        for config in backlog.by_ref().take(limit.get()) {
            in_flight.push(launch(config));
        }
        tracing::debug!(
            total,
            limit = limit.get(),
            seeded = in_flight.len(),
            "dispatching concurrent scrape"
        );
        Self {
            backlog,
            launch,
            in_flight,
        }
    }

    /// Jobs currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Jobs queued behind the concurrency limit.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.backlog.len()
    }
}

impl Stream for ConcurrentScrape<'_> {
    type Item = ScrapeOutcome;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.in_flight).poll_next(cx) {
            Poll::Ready(Some(outcome)) => {
                // Refill before yielding so the next job is admitted even
                // if the caller pauses between items.
                if let Some(config) = this.backlog.next() {
                    tracing::debug!(
                        url = config.url(),
                        remaining = this.backlog.len(),
                        "admitting queued job"
                    );
                    this.in_flight.push((this.launch)(config));
                }
                Poll::Ready(Some(outcome))
            }
            // The seed and per-completion refills keep jobs in flight while
            // any are queued, so an empty set means everything finished.
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.in_flight.len() + self.backlog.len();
        (remaining, Some(remaining))
    }
}

impl FusedStream for ConcurrentScrape<'_> {
    fn is_terminated(&self) -> bool {
        self.in_flight.is_empty() && self.backlog.as_slice().is_empty()
    }
}

impl fmt::Debug for ConcurrentScrape<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentScrape")
            .field("in_flight", &self.in_flight.len())
            .field("pending", &self.backlog.len())
            .finish_non_exhaustive()
    }
}
