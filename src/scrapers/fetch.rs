//! Page fetching with relaunch-and-retry.
//!
//! The crawler only needs one capability: give it a URL, get back the page
//! HTML once the interesting part has rendered. That is the [`PageFetcher`]
//! trait. Implementations:
//!
//! - [`HttpFetcher`]: plain `reqwest` client that re-polls a page until a
//!   marker element shows up
//! - `ChromiumFetcher` (feature `browser`, in `scrapers::browser`): headless
//!   Chromium that runs the page's scripts
//! - [`RelaunchingFetcher`]: decorator that recreates a broken fetcher and
//!   retries the same page a bounded number of times
//!
//! # Failure classes
//!
//! | Error | Meaning | Handling |
//! |-------|---------|----------|
//! | [`FetchError::Transient`] | the fetcher itself broke | relaunch, retry same page |
//! | [`FetchError::Timeout`] | page never rendered the marker within the page budget | fatal to the crawl |
//! | [`FetchError::Exhausted`] | relaunching ran out of attempts or failed | fatal to the crawl |

use crate::config::CrawlConfig;
use crate::error::FetchError;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::Client;
use scraper::{Html, Selector};
use std::fmt;
use std::time::Duration as StdDuration;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, error, instrument, warn};

/// Stands in for a marker in timeout errors when only the page load was awaited.
pub(crate) const PAGE_LOAD: &str = "page load";

/// Something that can load a page and hand back its rendered HTML.
pub trait PageFetcher {
    /// Fetch `url`, waiting until an element matching the CSS selector
    /// `marker` is present when one is given.
    async fn fetch_rendered_page(
        &mut self,
        url: &str,
        marker: Option<&str>,
    ) -> Result<String, FetchError>;

    /// Throw away the underlying resource and start a fresh one.
    async fn relaunch(&mut self) -> Result<(), FetchError>;
}

/// Whether `html` contains an element matching `marker`.
fn has_marker(html: &str, marker: &Selector) -> bool {
    Html::parse_document(html).select(marker).next().is_some()
}

/// `reqwest` backed fetcher that polls until the marker element appears.
///
/// The whole wait for one page, requests included, is bounded by
/// `page_timeout_secs`.
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    page_timeout: StdDuration,
    poll_interval: StdDuration,
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("page_timeout", &self.page_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

fn build_client(user_agent: &str, page_timeout: StdDuration) -> Result<Client, FetchError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(page_timeout)
        .build()
        .map_err(|e| FetchError::Transient {
            url: String::new(),
            message: format!("failed to build http client: {e}"),
        })
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, FetchError> {
        let page_timeout = StdDuration::from_secs(config.page_timeout_secs);
        Ok(Self {
            client: build_client(&config.user_agent, page_timeout)?,
            user_agent: config.user_agent.clone(),
            page_timeout,
            poll_interval: StdDuration::from_millis(config.poll_interval_ms),
        })
    }

    fn timed_out(&self, url: &str, marker: &str) -> FetchError {
        FetchError::Timeout {
            url: url.to_string(),
            marker: marker.to_string(),
            secs: self.page_timeout.as_secs(),
        }
    }

    /// One GET, cut off at `deadline`.
    async fn get_text(&self, url: &str, marker: &str, deadline: Instant) -> Result<String, FetchError> {
        let request = async {
            self.client
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        };
        match timeout_at(deadline, request).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) if e.is_timeout() => Err(self.timed_out(url, marker)),
            Ok(Err(e)) => Err(FetchError::Transient {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(self.timed_out(url, marker)),
        }
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_rendered_page(
        &mut self,
        url: &str,
        marker: Option<&str>,
    ) -> Result<String, FetchError> {
        let started = Instant::now();
        let deadline = started + self.page_timeout;
        let Some(marker) = marker else {
            return self.get_text(url, PAGE_LOAD, deadline).await;
        };
        let selector = Selector::parse(marker).map_err(|e| FetchError::Transient {
            url: url.to_string(),
            message: format!("invalid marker selector {marker}: {e}"),
        })?;

        loop {
            let body = self.get_text(url, marker, deadline).await?;
            if has_marker(&body, &selector) {
                debug!(elapsed_ms = started.elapsed().as_millis() as u64, bytes = body.len(), "Page rendered");
                return Ok(body);
            }
            if Instant::now() + self.poll_interval >= deadline {
                warn!(body_preview = %truncate_for_log(&body, 200), "Marker never appeared");
                return Err(self.timed_out(url, marker));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn relaunch(&mut self) -> Result<(), FetchError> {
        self.client = build_client(&self.user_agent, self.page_timeout)?;
        Ok(())
    }
}

/// Wraps a [`PageFetcher`] so a transient failure relaunches it and retries
/// the same page, up to `max_relaunches` times.
///
/// The delay between attempts follows
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
/// Timeouts are passed straight through. Giving up, or failing to relaunch,
/// yields [`FetchError::Exhausted`] with the number of fetches actually made.
pub struct RelaunchingFetcher<F> {
    inner: F,
    max_relaunches: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
    max_jitter_ms: u64,
}

impl<F: PageFetcher> RelaunchingFetcher<F> {
    pub fn new(inner: F, max_relaunches: usize) -> Self {
        Self {
            inner,
            max_relaunches,
            base_delay: StdDuration::from_secs(1),
            max_delay: StdDuration::from_secs(30),
            max_jitter_ms: 250,
        }
    }

    /// Override the backoff schedule.
    #[cfg(test)]
    pub fn with_backoff(mut self, base_delay: StdDuration, max_jitter_ms: u64) -> Self {
        self.base_delay = base_delay;
        self.max_jitter_ms = max_jitter_ms;
        self
    }

    #[cfg(test)]
    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F> fmt::Debug for RelaunchingFetcher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaunchingFetcher")
            .field("max_relaunches", &self.max_relaunches)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

fn exhausted(url: &str, attempts: usize, source: FetchError) -> FetchError {
    FetchError::Exhausted {
        url: url.to_string(),
        attempts,
        source: Box::new(source),
    }
}

impl<F: PageFetcher> PageFetcher for RelaunchingFetcher<F> {
    #[instrument(level = "info", skip(self))]
    async fn fetch_rendered_page(
        &mut self,
        url: &str,
        marker: Option<&str>,
    ) -> Result<String, FetchError> {
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            let e = match self.inner.fetch_rendered_page(url, marker).await {
                Ok(body) => return Ok(body),
                Err(e @ FetchError::Timeout { .. }) => return Err(e),
                Err(e) => e,
            };
            if attempt > self.max_relaunches {
                error!(attempt, max = self.max_relaunches, error = %e, "Fetcher exhausted relaunches");
                return Err(exhausted(url, attempt, e));
            }

            let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
            if delay > self.max_delay {
                delay = self.max_delay;
            }
            let jitter_ms: u64 = rng().random_range(0..=self.max_jitter_ms);
            let delay = delay + StdDuration::from_millis(jitter_ms);

            warn!(attempt, max = self.max_relaunches, ?delay, error = %e, "Fetcher crashed; relaunching");
            sleep(delay).await;
            if let Err(relaunch_err) = self.inner.relaunch().await {
                error!(attempt, error = %relaunch_err, "Fetcher could not be relaunched");
                return Err(exhausted(url, attempt, relaunch_err));
            }
        }
    }

    async fn relaunch(&mut self) -> Result<(), FetchError> {
        self.inner.relaunch().await
    }
}
