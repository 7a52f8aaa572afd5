//! Output generation for lookups and saved crawls.
//!
//! # Submodules
//!
//! - [`json`]: save and replay crawled camera lists
//! - [`report`]: render a lookup outcome for the terminal, as text or JSON
//!
//! # Crawl file
//!
//! ```text
//! [
//!   { "display_name": "Paris, france", "feed_url": "https://www.earthcam.com/world/france/paris/" },
//!   ...
//! ]
//! ```

pub mod json;
pub mod report;
