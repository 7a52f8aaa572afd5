//! Saving and replaying crawls as JSON.
//!
//! A crawl takes minutes; writing its result to disk lets later sessions
//! skip straight to resolution with `--locations`.

use crate::models::RawLocation;
use crate::utils::ensure_parent_dir;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write crawled locations as pretty JSON to `path`.
#[instrument(level = "info", skip_all, fields(path = %path, count = locations.len()))]
pub async fn write_locations(locations: &[RawLocation], path: &str) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(locations)?;
    ensure_parent_dir(path).await?;

    if let Err(e) = fs::write(path, json).await {
        error!(error = %e, "Failed writing crawl file");
        return Err(e.into());
    }
    info!("Wrote crawl file");
    Ok(())
}

/// Read locations previously written by [`write_locations`].
#[instrument(level = "info")]
pub async fn read_locations(path: &str) -> Result<Vec<RawLocation>, Box<dyn Error>> {
    let text = fs::read_to_string(path).await?;
    let locations: Vec<RawLocation> = serde_json::from_str(&text)?;
    info!(count = locations.len(), "Loaded saved crawl");
    Ok(locations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_preserves_order() {
        let dir = std::env::temp_dir().join(format!("sunline-json-{}", std::process::id()));
        let path = dir.join("nested").join("cams.json");
        let path = path.to_str().unwrap();
        let locations = vec![
            RawLocation::new("Tokyo, Japan", "https://cams.example/tokyo"),
            RawLocation::new("Paris, France", "https://cams.example/paris"),
        ];

        write_locations(&locations, path).await.unwrap();
        let loaded = read_locations(path).await.unwrap();
        assert_eq!(loaded, locations);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_read_rejects_malformed_json() {
        let path = std::env::temp_dir().join(format!("sunline-bad-{}.json", std::process::id()));
        std::fs::write(&path, "[{\"display_name\": 1}]").unwrap();
        assert!(read_locations(path.to_str().unwrap()).await.is_err());
        let _ = std::fs::remove_file(&path);
    }
}
