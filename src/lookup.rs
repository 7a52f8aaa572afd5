//! The caller-facing lookups: sunrise, sunset, or whichever is closer.
//!
//! Degrees of longitude are turned into miles and kilometres with flat
//! equatorial factors. A camera only counts as found when it is under
//! [`USABLE_DISTANCE_MILES`] from the terminator.

use crate::error::LookupError;
use crate::models::{LookupOutcome, MatchResult, SunEvent, TerminatorQuery};
use crate::registry::CameraRegistry;
use crate::search::find_nearest;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

pub const MILES_PER_DEGREE: f64 = 69.0;
pub const KM_PER_DEGREE: f64 = 111.0;
pub const USABLE_DISTANCE_MILES: f64 = 250.0;

pub fn degrees_to_miles(degrees: f64) -> f64 {
    degrees * MILES_PER_DEGREE
}

pub fn degrees_to_km(degrees: f64) -> f64 {
    degrees * KM_PER_DEGREE
}

/// Whether a match is close enough to the terminator to be worth watching.
pub fn is_usable(longitude_distance: f64) -> bool {
    degrees_to_miles(longitude_distance) < USABLE_DISTANCE_MILES
}

/// Nearest camera for one event, without applying the usability threshold.
fn nearest_for(
    registry: &CameraRegistry,
    query: TerminatorQuery,
) -> Result<(MatchResult, f64), LookupError> {
    let target = query.target_longitude();
    let found = find_nearest(registry, target).ok_or(LookupError::EmptyRegistry)?;
    Ok((found, target))
}

fn outcome(event: SunEvent, found: MatchResult, target: f64, now: DateTime<Utc>) -> LookupOutcome {
    if !is_usable(found.longitude_distance) {
        return not_found(event, target, now);
    }
    LookupOutcome {
        found: true,
        event,
        distance_miles: Some(degrees_to_miles(found.longitude_distance)),
        distance_km: Some(degrees_to_km(found.longitude_distance)),
        feed_url: Some(found.feed_url),
        target_longitude: target,
        utc_now: now,
    }
}

fn not_found(event: SunEvent, target: f64, now: DateTime<Utc>) -> LookupOutcome {
    LookupOutcome {
        found: false,
        event,
        feed_url: None,
        distance_miles: None,
        distance_km: None,
        target_longitude: target,
        utc_now: now,
    }
}

/// Closest camera to where `event` is happening at `now`.
#[instrument(level = "info", skip(registry), fields(cameras = registry.len()))]
pub fn load_event(
    registry: &CameraRegistry,
    event: SunEvent,
    now: DateTime<Utc>,
) -> Result<LookupOutcome, LookupError> {
    let (found, target) = nearest_for(registry, TerminatorQuery::new(event, now))?;
    let result = outcome(event, found, target, now);
    info!(found = result.found, feed = ?result.feed_url, miles = ?result.distance_miles, "Lookup finished");
    Ok(result)
}

pub fn load_sunrise(
    registry: &CameraRegistry,
    now: DateTime<Utc>,
) -> Result<LookupOutcome, LookupError> {
    load_event(registry, SunEvent::Sunrise, now)
}

pub fn load_sunset(
    registry: &CameraRegistry,
    now: DateTime<Utc>,
) -> Result<LookupOutcome, LookupError> {
    load_event(registry, SunEvent::Sunset, now)
}

/// Sunrise or sunset, whichever camera sits closer to its terminator.
///
/// Not found only when neither is within the usability threshold. Sunset
/// wins an exact tie.
#[instrument(level = "info", skip(registry), fields(cameras = registry.len()))]
pub fn load_best(
    registry: &CameraRegistry,
    now: DateTime<Utc>,
) -> Result<LookupOutcome, LookupError> {
    let (rise, rise_target) = nearest_for(registry, TerminatorQuery::new(SunEvent::Sunrise, now))?;
    let (set, set_target) = nearest_for(registry, TerminatorQuery::new(SunEvent::Sunset, now))?;

    // The closer event is usable whenever either one is.
    let result = if rise.longitude_distance < set.longitude_distance {
        outcome(SunEvent::Sunrise, rise, rise_target, now)
    } else {
        outcome(SunEvent::Sunset, set, set_target, now)
    };
    info!(event = %result.event, found = result.found, feed = ?result.feed_url, "Best lookup finished");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CameraEntry;
    use chrono::TimeZone;
    use rstest::rstest;

    fn registry(longitudes: &[f64]) -> CameraRegistry {
        longitudes
            .iter()
            .map(|longitude| CameraEntry {
                longitude: *longitude,
                feed_url: format!("https://cams.example/{longitude}"),
            })
            .collect()
    }

    /// 2025-04-12 05:30 UTC: sunrise terminator on 0°, sunset terminator on
    /// (19:30 - 05:30) * 15 = 210 -> -150°.
    fn april_dawn() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 12, 5, 30, 0).unwrap()
    }

    #[rstest]
    #[case(3.7, false)]
    #[case(3.6, true)]
    #[case(0.0, true)]
    #[case(180.0, false)]
    fn test_usability_threshold(#[case] degrees: f64, #[case] usable: bool) {
        assert_eq!(is_usable(degrees), usable);
    }

    #[test]
    fn test_sunrise_found_with_distances() {
        let outcome = load_sunrise(&registry(&[2.0, 90.0]), april_dawn()).unwrap();
        assert!(outcome.found);
        assert_eq!(outcome.event, SunEvent::Sunrise);
        assert_eq!(outcome.feed_url.as_deref(), Some("https://cams.example/2"));
        assert_eq!(outcome.distance_miles, Some(138.0));
        assert_eq!(outcome.distance_km, Some(222.0));
    }

    #[test]
    fn test_sunrise_too_far_is_not_found() {
        let outcome = load_sunrise(&registry(&[10.0]), april_dawn()).unwrap();
        assert!(!outcome.found);
        assert_eq!(outcome.feed_url, None);
        assert_eq!(outcome.target_longitude, 0.0);
    }

    #[test]
    fn test_sunset_uses_sunset_table() {
        let outcome = load_sunset(&registry(&[2.0, -151.0]), april_dawn()).unwrap();
        assert!(outcome.found);
        assert_eq!(outcome.feed_url.as_deref(), Some("https://cams.example/-151"));
    }

    #[test]
    fn test_best_picks_closer_event() {
        let now = april_dawn();
        let outcome = load_best(&registry(&[3.0, -151.0]), now).unwrap();
        assert_eq!(outcome.event, SunEvent::Sunset);
        assert_eq!(outcome.feed_url.as_deref(), Some("https://cams.example/-151"));

        let outcome = load_best(&registry(&[0.5, -152.0]), now).unwrap();
        assert_eq!(outcome.event, SunEvent::Sunrise);
        assert_eq!(outcome.feed_url.as_deref(), Some("https://cams.example/0.5"));
    }

    #[test]
    fn test_best_not_found_when_both_far() {
        let outcome = load_best(&registry(&[60.0]), april_dawn()).unwrap();
        assert!(!outcome.found);
    }

    #[test]
    fn test_empty_registry_is_an_error() {
        let err = load_best(&CameraRegistry::default(), april_dawn()).unwrap_err();
        assert_eq!(err, LookupError::EmptyRegistry);
    }
}
