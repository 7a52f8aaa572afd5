//! Country name normalization.
//!
//! Camera labels carry countries the way a person writes them ("United
//! States", "UK", "South Korea"), while the gazetteer is keyed by ISO-3166
//! alpha-2 codes. [`to_alpha2`] bridges the two, trying in order:
//!
//! 1. an alpha-2 or alpha-3 code (`"fr"`, `"FRA"`)
//! 2. the ISO short name (`"France"`)
//! 3. a table of everyday names and variants
//! 4. the ISO short name with its qualifier dropped, so `"Bolivia"` matches
//!    `"Bolivia (Plurinational State of)"`

use isocountry::CountryCode;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("united states", "US"),
        ("usa", "US"),
        ("u.s.", "US"),
        ("u.s.a.", "US"),
        ("america", "US"),
        ("uk", "GB"),
        ("u.k.", "GB"),
        ("united kingdom", "GB"),
        ("great britain", "GB"),
        ("britain", "GB"),
        ("england", "GB"),
        ("scotland", "GB"),
        ("wales", "GB"),
        ("northern ireland", "GB"),
        ("south korea", "KR"),
        ("korea", "KR"),
        ("north korea", "KP"),
        ("russia", "RU"),
        ("vietnam", "VN"),
        ("viet nam", "VN"),
        ("laos", "LA"),
        ("iran", "IR"),
        ("syria", "SY"),
        ("taiwan", "TW"),
        ("tanzania", "TZ"),
        ("moldova", "MD"),
        ("czech republic", "CZ"),
        ("czechia", "CZ"),
        ("holland", "NL"),
        ("the netherlands", "NL"),
        ("netherlands", "NL"),
        ("turkey", "TR"),
        ("turkiye", "TR"),
        ("türkiye", "TR"),
        ("bolivia", "BO"),
        ("venezuela", "VE"),
        ("macedonia", "MK"),
        ("north macedonia", "MK"),
        ("ivory coast", "CI"),
        ("cape verde", "CV"),
        ("swaziland", "SZ"),
        ("eswatini", "SZ"),
        ("vatican", "VA"),
        ("vatican city", "VA"),
        ("brunei", "BN"),
        ("micronesia", "FM"),
        ("palestine", "PS"),
        ("dr congo", "CD"),
        ("democratic republic of the congo", "CD"),
        ("republic of the congo", "CG"),
        ("st. maarten", "SX"),
        ("sint maarten", "SX"),
        ("st. lucia", "LC"),
        ("saint lucia", "LC"),
        ("st. kitts and nevis", "KN"),
        ("st. vincent and the grenadines", "VC"),
        ("st. barts", "BL"),
        ("st. barthelemy", "BL"),
        ("us virgin islands", "VI"),
        ("u.s. virgin islands", "VI"),
        ("british virgin islands", "VG"),
        ("curacao", "CW"),
        ("bonaire", "BQ"),
        ("caribbean netherlands", "BQ"),
        ("falkland islands", "FK"),
        ("reunion", "RE"),
        ("uae", "AE"),
    ])
});

fn normalize(name: &str) -> String {
    WHITESPACE
        .replace_all(name.trim(), " ")
        .to_lowercase()
}

/// Drop an ISO name's qualifier: `"Korea, Republic of"` -> `"korea"`,
/// `"Bolivia (Plurinational State of)"` -> `"bolivia"`.
fn base_name(iso_name: &str) -> String {
    let cut = iso_name
        .find([',', '('])
        .map(|idx| &iso_name[..idx])
        .unwrap_or(iso_name);
    normalize(cut)
}

/// Map a country name, variant or code to its ISO-3166 alpha-2 code.
pub fn to_alpha2(name: &str) -> Option<&'static str> {
    let wanted = normalize(name);
    if wanted.is_empty() {
        return None;
    }

    if wanted.len() == 2 {
        if let Ok(code) = CountryCode::for_alpha2_caseless(&wanted) {
            return Some(code.alpha2());
        }
    }
    if wanted.len() == 3 {
        if let Ok(code) = CountryCode::for_alpha3_caseless(&wanted) {
            return Some(code.alpha2());
        }
    }

    if let Some(code) = CountryCode::iter().find(|code| normalize(code.name()) == wanted) {
        return Some(code.alpha2());
    }

    if let Some(alpha2) = ALIASES.get(wanted.as_str()).copied() {
        return Some(alpha2);
    }

    let wanted = wanted.strip_prefix("the ").unwrap_or(&wanted);
    CountryCode::iter()
        .find(|code| base_name(code.name()) == wanted)
        .map(|code| code.alpha2())
}
