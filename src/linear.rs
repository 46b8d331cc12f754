//! Linear unit normalization for railway mileages.
//!
//! Lines report positions either in imperial miles and yards (encoded as `mmm.yyyy`)
//! or in metric kilometres. Everything downstream joins and sorts on a single integer
//! unit, total yards.

use serde::{Deserialize, Serialize};

/// Number of yards in a mile.
pub const YARDS_IN_MILE: i64 = 1_760;

/// Kilometres in one yard, exact by definition.
pub const KM_IN_YARD: f64 = 0.0009144;

/// Metres in one yard, exact by definition.
pub const YARDS_TO_METRES: f64 = 0.9144;

/// Tag used by the source datasets for imperial reporting.
pub const IMPERIAL_TAG: &str = "M";

/// Reporting system of a mileage value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinearSystem {
    /// Miles and yards, encoded as `mmm.yyyy`
    Imperial,
    /// Kilometres
    Metric,
}

impl LinearSystem {
    /// Resolve a source system tag.
    ///
    /// Only `"M"` selects imperial. Every other tag, including unknown or empty ones,
    /// is treated as metric.
    pub fn from_tag(tag: &str) -> Self {
        if tag == IMPERIAL_TAG {
            LinearSystem::Imperial
        } else {
            LinearSystem::Metric
        }
    }

    pub fn is_metric(&self) -> bool {
        matches!(self, LinearSystem::Metric)
    }
}

impl std::fmt::Display for LinearSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinearSystem::Imperial => write!(f, "imperial"),
            LinearSystem::Metric => write!(f, "metric"),
        }
    }
}

/// Convert a decimal mileage of form `mmm.yyyy` to total yards.
///
/// The integer part is whole miles (truncated toward zero, so the sign carries
/// through), the four fractional digits are yards. Yards are not clamped to 0..1760.
pub fn miles_yards_to_total_yards(miles_yards: f64) -> i64 {
    let miles = miles_yards.trunc();
    (YARDS_IN_MILE as f64 * miles + 10_000.0 * (miles_yards - miles)).round() as i64
}

/// Convert kilometres to the nearest total yards (half rounds up for positive values).
pub fn km_to_total_yards(kilometres: f64) -> i64 {
    (kilometres / KM_IN_YARD + 0.5) as i64
}

/// Convert a reported mileage to total yards according to its reporting system.
pub fn to_total_yards(system: LinearSystem, value: f64) -> i64 {
    match system {
        LinearSystem::Imperial => miles_yards_to_total_yards(value),
        LinearSystem::Metric => km_to_total_yards(value),
    }
}

/// Split total yards into whole miles and remaining yards.
///
/// Values below one mile, including all negative values, come back as zero miles
/// with the yards unchanged.
pub fn explode_total_yards(total_yards: i64) -> (i64, i64) {
    if total_yards >= YARDS_IN_MILE {
        return (total_yards / YARDS_IN_MILE, total_yards % YARDS_IN_MILE);
    }
    (0, total_yards)
}

/// Build total yards from miles and yards components.
pub fn build_total_yards(miles: i64, yards: i64) -> i64 {
    miles * YARDS_IN_MILE + yards
}

/// Format total yards as `"35M 0880y"` or, for metric lines, `"1.609km"`.
pub fn format_total_yards(total_yards: i64, system: LinearSystem) -> String {
    match system {
        LinearSystem::Metric => {
            format!("{:.3}km", total_yards as f64 * YARDS_TO_METRES / 1_000.0)
        }
        LinearSystem::Imperial => {
            let (miles, yards) = explode_total_yards(total_yards);
            format!("{}M {:04}y", miles, yards)
        }
    }
}

/// Format a from/to pair of total yards, e.g. `"0M 0000y to 1M 0000y"`.
pub fn format_mileages(from: i64, to: i64, system: LinearSystem) -> String {
    format!(
        "{} to {}",
        format_total_yards(from, system),
        format_total_yards(to, system)
    )
}
