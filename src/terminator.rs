//! Coarse estimate of where the sun is rising or setting right now.
//!
//! Each month has one representative UTC clock time for sunrise and one for
//! sunset, with no DST applied. These were hand calibrated (checked against
//! live feeds on 2025-04-12) and are a known approximation: latitude and the
//! day within the month are ignored entirely.
//!
//! If the event happens at `T` local time and it is `now` in UTC, the
//! longitude currently at local time `T` is `(T - now) * 15` degrees, one
//! timezone being 15 degrees wide.

use crate::models::{SunEvent, TerminatorQuery};
use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::debug;

const DEGREES_PER_HOUR: f64 = 15.0;

/// `(hour, minute)` per month, January first.
const SUNRISE_TIMES: [(u32, u32); 12] = [
    (8, 0),
    (7, 15),
    (6, 15),
    (5, 30),
    (4, 45),
    (4, 30),
    (4, 45),
    (5, 30),
    (6, 15),
    (7, 0),
    (7, 45),
    (8, 0),
];

const SUNSET_TIMES: [(u32, u32); 12] = [
    (16, 0),
    (17, 0),
    (18, 0),
    (19, 30),
    (20, 30),
    (21, 0),
    (20, 45),
    (20, 0),
    (19, 0),
    (18, 0),
    (16, 30),
    (16, 0),
];

/// Reference clock time for an event in a month (1-12), in hours.
fn reference_hours(event: SunEvent, month: u32) -> f64 {
    let table = match event {
        SunEvent::Sunrise => &SUNRISE_TIMES,
        SunEvent::Sunset => &SUNSET_TIMES,
    };
    let (hour, minute) = table[(month as usize - 1) % 12];
    hour as f64 + minute as f64 / 60.0
}

fn hours_since_midnight(now: &DateTime<Utc>) -> f64 {
    let time = now.time();
    let seconds = time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9;
    seconds / 3600.0
}

/// Longitude in `[-180, 180]` where `event` is estimated to be happening at `now`.
pub fn estimate_target_longitude(event: SunEvent, now: DateTime<Utc>) -> f64 {
    let delta_hours = reference_hours(event, now.month()) - hours_since_midnight(&now);
    let mut longitude = delta_hours * DEGREES_PER_HOUR;

    // The table range keeps the raw value within one turn of the valid range.
    if longitude < -180.0 {
        longitude += 360.0;
    }
    if longitude > 180.0 {
        longitude -= 360.0;
    }

    debug!(%event, utc_now = %now, delta_hours, longitude, "Estimated terminator longitude");
    longitude
}

impl TerminatorQuery {
    pub fn new(event: SunEvent, instant: DateTime<Utc>) -> Self {
        Self { event, instant }
    }

    pub fn target_longitude(&self) -> f64 {
        estimate_target_longitude(self.event, self.instant)
    }
}
