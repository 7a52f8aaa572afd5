//! Nearest camera to a target longitude.

use crate::models::MatchResult;
use crate::registry::CameraRegistry;

/// Angular distance between two longitudes, accounting for the ±180° seam.
///
/// `circular_distance(179.0, -179.0)` is `2.0`, not `358.0`.
pub fn circular_distance(a: f64, b: f64) -> f64 {
    let direct = (a - b).abs();
    let east = ((a + 360.0) - b).abs();
    let west = ((a - 360.0) - b).abs();
    direct.min(east).min(west)
}

/// The registry entry closest to `target_longitude`.
///
/// Linear scan; the earliest entry wins ties, so the result depends only on
/// registry order. Returns `None` for an empty registry.
pub fn find_nearest(registry: &CameraRegistry, target_longitude: f64) -> Option<MatchResult> {
    let (best, distance) = registry
        .entries()
        .iter()
        .map(|entry| (entry, circular_distance(entry.longitude, target_longitude)))
        .min_by(|(_, lhs), (_, rhs)| lhs.total_cmp(rhs))?;

    Some(MatchResult {
        feed_url: best.feed_url.clone(),
        longitude_distance: distance,
    })
}
