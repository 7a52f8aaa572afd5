//! Terminal rendering of lookup outcomes.

use crate::models::LookupOutcome;

/// Human readable outcome, one or two lines.
///
/// Distances are rounded to whole miles and kilometres.
pub fn render_text(outcome: &LookupOutcome) -> String {
    match (&outcome.feed_url, outcome.distance_miles, outcome.distance_km) {
        (Some(feed_url), Some(miles), Some(km)) if outcome.found => format!(
            "Approximate distance from cam to {} front: {:.0} miles/{:.0} kilometers\nGo to feed: {}",
            outcome.event, miles, km, feed_url
        ),
        _ => format!("No {} feed found", outcome.event),
    }
}

/// The message `best` prints when neither event has a usable camera.
pub fn render_best_not_found() -> &'static str {
    "No sunset or sunrise feed found"
}

/// Outcome as a single JSON object.
pub fn render_json(outcome: &LookupOutcome) -> Result<String, serde_json::Error> {
    serde_json::to_string(outcome)
}
