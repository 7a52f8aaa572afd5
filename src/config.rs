//! Crawler settings, optionally loaded from a YAML file.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```yaml
//! page_timeout_secs: 45
//! max_relaunches: 2
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub const DEFAULT_INDEX_URL: &str = "https://www.earthcam.com/network/";

/// Desktop Chrome; the camera network serves a stripped page to obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.212 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Camera network index listing every country and US state.
    pub index_url: String,
    /// How long a location page may take to show its camera list.
    pub page_timeout_secs: u64,
    /// Delay between polls while waiting for a page to render.
    pub poll_interval_ms: u64,
    /// How many times a broken fetcher is recreated for the same page.
    pub max_relaunches: usize,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            index_url: DEFAULT_INDEX_URL.to_string(),
            page_timeout_secs: 30,
            poll_interval_ms: 1000,
            max_relaunches: 1,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn from_yaml(text: &str, path: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Load from `path`, or fall back to defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_string(),
                source,
            })?;
        let config = Self::from_yaml(&text, path)?;
        info!(?config, "Loaded crawl configuration");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = CrawlConfig::from_yaml("page_timeout_secs: 45\nmax_relaunches: 2\n", "test.yaml")
            .unwrap();
        assert_eq!(config.page_timeout_secs, 45);
        assert_eq!(config.max_relaunches, 2);
        assert_eq!(config.index_url, DEFAULT_INDEX_URL);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = CrawlConfig::from_yaml("page_timeout_secs: [not, a, number]", "bad.yaml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_no_path_uses_defaults() {
        assert_eq!(CrawlConfig::load(None).await.unwrap(), CrawlConfig::default());
    }
}
