//! Data models shared by the crawler, the registry and the lookup operations.
//!
//! - [`RawLocation`]: a camera as discovered by the crawler, not yet resolved
//! - [`CameraEntry`]: a resolved camera, reduced to what the lookups need
//! - [`SunEvent`] / [`TerminatorQuery`]: what the caller is looking for
//! - [`MatchResult`] / [`LookupOutcome`]: what a lookup produces

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A camera as scraped from the camera network.
///
/// `display_name` has the form `"<place>, <region-or-country>"` and is not
/// guaranteed to be resolvable to coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawLocation {
    /// Human readable place label, e.g. `"Times Square, New York, United States"`.
    pub display_name: String,
    /// Absolute URL of the live feed page.
    pub feed_url: String,
}

impl RawLocation {
    pub fn new(display_name: impl Into<String>, feed_url: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            feed_url: feed_url.into(),
        }
    }
}

/// A resolved camera. Only the longitude matters for terminator matching,
/// so the name and latitude are not carried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraEntry {
    /// Longitude in degrees, `[-180, 180]`.
    pub longitude: f64,
    /// Absolute URL of the live feed page.
    pub feed_url: String,
}

/// The solar event a lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

impl fmt::Display for SunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SunEvent::Sunrise => f.write_str("sunrise"),
            SunEvent::Sunset => f.write_str("sunset"),
        }
    }
}

/// One lookup request: which event, at which instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminatorQuery {
    pub event: SunEvent,
    pub instant: DateTime<Utc>,
}

/// The closest camera to a target longitude.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub feed_url: String,
    /// Circular longitude distance in degrees, `[0, 180]`.
    pub longitude_distance: f64,
}

/// What a lookup operation hands to the front-end.
///
/// When `found` is `false` the feed and distances are omitted: the nearest
/// camera was too far from the terminator to be worth showing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupOutcome {
    pub found: bool,
    pub event: SunEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_miles: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    /// Estimated terminator longitude the search targeted.
    pub target_longitude: f64,
    pub utc_now: DateTime<Utc>,
}
