//! The per-session camera registry and its builder.

use crate::models::{CameraEntry, RawLocation};
use crate::resolver::PlaceResolver;
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Resolved cameras in crawl order. Immutable once built.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CameraRegistry {
    entries: Vec<CameraEntry>,
}

/// How many raw locations made it into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub resolved: usize,
    pub dropped: usize,
}

impl CameraRegistry {
    /// Resolve every raw location and keep the ones that have coordinates.
    ///
    /// Unresolvable locations are dropped without an error; only the totals
    /// are reported. Whatever subset the crawler delivered is processed.
    #[instrument(level = "info", skip_all, fields(raw = raw_locations.len()))]
    pub fn build(
        resolver: &PlaceResolver,
        raw_locations: &[RawLocation],
    ) -> (Self, BuildReport) {
        let mut entries = Vec::with_capacity(raw_locations.len());
        for location in raw_locations {
            match resolver.resolve(&location.display_name) {
                Some((_, longitude)) => entries.push(CameraEntry {
                    longitude,
                    feed_url: location.feed_url.clone(),
                }),
                None => {
                    debug!(name = %location.display_name, "Dropping unresolvable camera");
                }
            }
        }

        let report = BuildReport {
            resolved: entries.len(),
            dropped: raw_locations.len() - entries.len(),
        };
        info!(
            resolved = report.resolved,
            dropped = report.dropped,
            "Cameras found"
        );
        (Self { entries }, report)
    }

    pub fn entries(&self) -> &[CameraEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CameraEntry> for CameraRegistry {
    fn from_iter<I: IntoIterator<Item = CameraEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
