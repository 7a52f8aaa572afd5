//! Static place-name to coordinate table.
//!
//! Built once from a GeoNames style tab separated dump (`cities500.txt`).
//! Only four columns are read (1-based):
//!
//! | Column | Field |
//! |--------|-------|
//! | 2 | place name |
//! | 5 | latitude |
//! | 6 | longitude |
//! | 9 | ISO-3166 alpha-2 country code |
//!
//! Keys are `"<name>,<code>"`, both lowercased and trimmed. The first row
//! seen for a key wins; later duplicates are ignored.

use crate::error::GazetteerError;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::{debug, info, instrument, warn};

const NAME_COLUMN: usize = 1;
const LATITUDE_COLUMN: usize = 4;
const LONGITUDE_COLUMN: usize = 5;
const COUNTRY_COLUMN: usize = 8;

/// Immutable lookup from `(city, country_code)` to `(latitude, longitude)`.
#[derive(Debug, Default)]
pub struct Gazetteer {
    places: HashMap<String, (f64, f64)>,
    skipped_rows: usize,
}

fn key(city: &str, country_code: &str) -> String {
    format!(
        "{},{}",
        city.trim().to_lowercase(),
        country_code.trim().to_lowercase()
    )
}

impl Gazetteer {
    /// Parse a tab separated dump already held in memory.
    ///
    /// Rows with too few columns or non-numeric coordinates are skipped and
    /// counted in [`Gazetteer::skipped_rows`].
    pub fn from_tsv(text: &str) -> Self {
        let mut gazetteer = Gazetteer::default();
        for (line_number, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_row(line) {
                Some((name, code, coords)) => gazetteer.insert(name, code, coords),
                None => {
                    debug!(line = line_number + 1, "Skipping malformed gazetteer row");
                    gazetteer.skipped_rows += 1;
                }
            }
        }
        gazetteer
    }

    /// Read and parse a gazetteer file.
    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self, GazetteerError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| GazetteerError::Io {
                path: path.to_string(),
                source,
            })?;
        let gazetteer = Self::from_tsv(&text);
        if gazetteer.is_empty() {
            return Err(GazetteerError::Empty {
                path: path.to_string(),
            });
        }
        if gazetteer.skipped_rows() > 0 {
            warn!(skipped = gazetteer.skipped_rows(), "Gazetteer had malformed rows");
        }
        info!(places = gazetteer.len(), skipped = gazetteer.skipped_rows(), "Loaded gazetteer");
        Ok(gazetteer)
    }

    /// Insert a place unless the key is already taken.
    pub fn insert(&mut self, city: &str, country_code: &str, coords: (f64, f64)) {
        if let Entry::Vacant(slot) = self.places.entry(key(city, country_code)) {
            slot.insert(coords);
        }
    }

    /// Coordinates for a city in a country, case-insensitively.
    pub fn get(&self, city: &str, country_code: &str) -> Option<(f64, f64)> {
        self.places.get(&key(city, country_code)).copied()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}

fn parse_row(line: &str) -> Option<(&str, &str, (f64, f64))> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() <= COUNTRY_COLUMN {
        return None;
    }
    let name = columns[NAME_COLUMN].trim();
    let code = columns[COUNTRY_COLUMN].trim();
    if name.is_empty() || code.is_empty() {
        return None;
    }
    let lat = columns[LATITUDE_COLUMN].trim().parse::<f64>().ok()?;
    let lon = columns[LONGITUDE_COLUMN].trim().parse::<f64>().ok()?;
    Some((name, code, (lat, lon)))
}
