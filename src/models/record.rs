//! Flat gazetteer output record.

use serde::{Deserialize, Serialize};

/// One gazetteer row per sampled line position.
///
/// Field order is the column order of the raw CSV and is relied upon by the
/// normalization SQL script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazetteerRecord {
    pub elr: String,
    pub total_yards: i64,
    pub region_name: Option<String>,
    pub place_name: Option<String>,
    pub district: Option<String>,
    pub county_unitary: Option<String>,
    /// Planar distance to the nearest place, truncated to whole metres
    pub distance_to_place_m: Option<i64>,
    pub country: Option<String>,
    pub admin_area: Option<String>,
}

impl GazetteerRecord {
    /// CSV header, in output order
    pub const COLUMNS: [&'static str; 9] = [
        "elr",
        "total_yards",
        "region_name",
        "place_name",
        "district",
        "county_unitary",
        "distance_to_place_m",
        "country",
        "admin_area",
    ];

    /// Sort key: ELR by string comparison, then total yards numerically
    pub fn sort_key(&self) -> (&str, i64) {
        (&self.elr, self.total_yards)
    }
}
