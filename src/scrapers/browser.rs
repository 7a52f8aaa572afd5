//! Headless Chromium page fetcher.
//!
//! Location pages build their camera list in JavaScript, so reading them
//! needs a real browser. The browser presents a desktop user agent and hides
//! the usual automation tells (`navigator.webdriver`, the automation infobar,
//! the `AutomationControlled` blink feature).
//!
//! Requires a local Chrome or Chromium; `chromiumoxide` finds the executable
//! on its own.

use super::fetch::{PAGE_LOAD, PageFetcher};
use crate::config::CrawlConfig;
use crate::error::FetchError;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::fmt;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, instrument, warn};

/// Launch flags. chromiumoxide's default argument list is skipped so
/// `--enable-automation` is never passed.
const CHROME_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-software-rasterizer",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-logging",
    "--log-level=3",
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--no-first-run",
    "--no-default-browser-check",
];

/// Runs before any page script.
const STEALTH_SCRIPT: &str = r#"
    Object.defineProperty(navigator, 'webdriver', {get: () => undefined});
    Object.defineProperty(navigator, 'languages', {get: () => ['en-US', 'en']});
    Object.defineProperty(navigator, 'plugins', {get: () => [1, 2, 3, 4, 5]});
"#;

fn browser_error(url: &str, context: &str, e: impl fmt::Display) -> FetchError {
    FetchError::Transient {
        url: url.to_string(),
        message: format!("{context}: {e}"),
    }
}

/// JavaScript expression that is `true` once `marker` matches an element.
fn marker_check(marker: &str) -> String {
    format!(
        "document.querySelector({}) !== null",
        serde_json::Value::from(marker)
    )
}

struct Running {
    browser: Browser,
    handler: JoinHandle<()>,
}

/// [`PageFetcher`] driving one headless Chromium, one tab per page.
///
/// [`PageFetcher::relaunch`] kills the browser and starts a new one.
pub struct ChromiumFetcher {
    running: Option<Running>,
    user_agent: String,
    page_timeout: StdDuration,
    poll_interval: StdDuration,
}

impl fmt::Debug for ChromiumFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromiumFetcher")
            .field("running", &self.running.is_some())
            .field("page_timeout", &self.page_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl ChromiumFetcher {
    pub async fn launch(config: &CrawlConfig) -> Result<Self, FetchError> {
        let mut fetcher = Self {
            running: None,
            user_agent: config.user_agent.clone(),
            page_timeout: StdDuration::from_secs(config.page_timeout_secs),
            poll_interval: StdDuration::from_millis(config.poll_interval_ms),
        };
        fetcher.start().await?;
        Ok(fetcher)
    }

    async fn start(&mut self) -> Result<(), FetchError> {
        info!("Launching headless Chromium");
        let mut builder = BrowserConfig::builder()
            .disable_default_args()
            .window_size(500, 500)
            .arg(format!("--user-agent={}", self.user_agent));
        for arg in CHROME_ARGS {
            builder = builder.arg(*arg);
        }
        let config = builder
            .build()
            .map_err(|e| browser_error("", "invalid browser config", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_error("", "failed to launch browser", e))?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        self.running = Some(Running { browser, handler });
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(mut running) = self.running.take() {
            if let Err(e) = running.browser.close().await {
                debug!(error = %e, "Browser did not close cleanly");
            }
            running.handler.abort();
        }
    }

    async fn render(&self, page: &Page, url: &str, marker: Option<&str>) -> Result<String, FetchError> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(|e| browser_error(url, "failed to set user agent", e))?;
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|e| browser_error(url, "failed to install stealth script", e))?;
        page.goto(url)
            .await
            .map_err(|e| browser_error(url, "navigation failed", e))?;

        if let Some(marker) = marker {
            let check = marker_check(marker);
            loop {
                let present: bool = page
                    .evaluate(check.clone())
                    .await
                    .map_err(|e| browser_error(url, "page script failed", e))?
                    .into_value()
                    .map_err(|e| browser_error(url, "unexpected script result", e))?;
                if present {
                    break;
                }
                sleep(self.poll_interval).await;
            }
        }

        page.content()
            .await
            .map_err(|e| browser_error(url, "failed to read page content", e))
    }
}

impl PageFetcher for ChromiumFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_rendered_page(
        &mut self,
        url: &str,
        marker: Option<&str>,
    ) -> Result<String, FetchError> {
        let running = self
            .running
            .as_ref()
            .ok_or_else(|| browser_error(url, "browser is not running", "relaunch required"))?;
        let started = Instant::now();
        let page = running
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_error(url, "failed to open tab", e))?;

        let result = match timeout_at(started + self.page_timeout, self.render(&page, url, marker)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?marker, "Page did not render in time");
                Err(FetchError::Timeout {
                    url: url.to_string(),
                    marker: marker.unwrap_or(PAGE_LOAD).to_string(),
                    secs: self.page_timeout.as_secs(),
                })
            }
        };

        if let Err(e) = page.close().await {
            debug!(error = %e, "Tab did not close cleanly");
        }
        if result.is_ok() {
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Page rendered");
        }
        result
    }

    async fn relaunch(&mut self) -> Result<(), FetchError> {
        self.stop().await;
        self.start().await
    }
}
