//! Free-text camera labels to coordinates.

use crate::country::to_alpha2;
use crate::gazetteer::Gazetteer;

/// Resolves `"City, Region, Country"` labels against a [`Gazetteer`].
///
/// The first comma separated part is taken as the city and the last as the
/// country; anything in between (states, regions) is ignored. Ambiguous
/// city names get whichever entry the gazetteer kept.
#[derive(Debug)]
pub struct PlaceResolver {
    gazetteer: Gazetteer,
}

impl PlaceResolver {
    pub fn new(gazetteer: Gazetteer) -> Self {
        Self { gazetteer }
    }

    /// `(latitude, longitude)` for a label, or `None` when the label has no
    /// country part, the country is unknown, or the city is not listed.
    pub fn resolve(&self, display_name: &str) -> Option<(f64, f64)> {
        let parts: Vec<&str> = display_name.split(',').map(str::trim).collect();
        if parts.len() < 2 {
            return None;
        }
        let city = parts[0];
        let country_code = to_alpha2(parts[parts.len() - 1])?;
        self.gazetteer.get(city, country_code)
    }
}
