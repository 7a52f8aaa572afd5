//! Error types for each stage of the pipeline.
//!
//! Per-camera resolution failures are not errors: they are dropped and
//! counted by the registry builder. Everything here is either fatal to a
//! build or a precondition violation at lookup time.

use thiserror::Error;

/// Loading the gazetteer dataset failed.
#[derive(Debug, Error)]
pub enum GazetteerError {
    #[error("failed to read gazetteer {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("gazetteer {path} contains no usable rows")]
    Empty { path: String },
}

/// A single page fetch failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The fetching resource broke; relaunching it and retrying may help.
    #[error("transient fetch failure for {url}: {message}")]
    Transient { url: String, message: String },
    /// The page never showed the element we were waiting for.
    #[error("timed out after {secs}s waiting for {marker} on {url}")]
    Timeout { url: String, marker: String, secs: u64 },
    /// Relaunching stopped helping: either the retry budget ran out or the
    /// relaunch itself failed.
    #[error("gave up on {url} after {attempts} attempts: {source}")]
    Exhausted {
        url: String,
        attempts: usize,
        #[source]
        source: Box<FetchError>,
    },
}

/// The crawl as a whole failed and its partial results were discarded.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("request timeout detected, please try again later ({0})")]
    Timeout(#[source] FetchError),
    #[error("fetcher kept failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: FetchError,
    },
    #[error("could not load camera network index {url}: {source}")]
    Index {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("could not start page fetcher: {0}")]
    Fetcher(#[source] FetchError),
    #[error("invalid url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// A lookup could not run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("the camera registry has not been built for this session")]
    NotBuilt,
    #[error("no cameras could be resolved to a location")]
    EmptyRegistry,
}

/// Loading the optional YAML config failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}
