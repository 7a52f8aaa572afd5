//! Camera discovery.
//!
//! Crawling follows the same two-phase pattern for every network:
//!
//! 1. **Indexing**: read the network index for country and state pages
//! 2. **Fetching**: load each location page and pull out camera names and
//!    feed links
//!
//! # Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`fetch`] | [`PageFetcher`](fetch::PageFetcher) trait, HTTP implementation, relaunch-and-retry decorator |
//! | `browser` | headless Chromium fetcher (feature `browser`) |
//! | [`earthcam`] | EarthCam network index and location page parsing |
//!
//! Pages are fetched one at a time. A crashing fetcher is relaunched and the
//! same page retried; a page that never renders aborts the whole crawl.

#[cfg(feature = "browser")]
pub mod browser;
pub mod earthcam;
pub mod fetch;

#[cfg(feature = "browser")]
pub use browser::ChromiumFetcher;
pub use fetch::HttpFetcher;
