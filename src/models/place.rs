//! Populated place records.

use geo::Point;

/// Language code marking the English variant of a place name.
pub const ENGLISH_LANG: &str = "eng";

/// A named settlement with its administrative subdivisions
#[derive(Debug, Clone)]
pub struct Place {
    /// Canonical (English) name
    pub name: String,
    pub district: Option<String>,
    pub county_unitary: Option<String>,
    pub location: Point<f64>,
}

/// Pick the English variant of a place name.
///
/// Where the alternate name is flagged as English (the primary being Welsh or Gaelic),
/// the alternate wins.
pub fn canonical_place_name(
    name: String,
    alt_name: Option<String>,
    alt_lang: Option<&str>,
) -> String {
    match (alt_name, alt_lang) {
        (Some(alt), Some(lang)) if lang.eq_ignore_ascii_case(ENGLISH_LANG) => alt,
        _ => name,
    }
}
