//! Railway line records: sampled points, centrelines and mileposts.

use std::sync::OnceLock;

use geo::{MultiLineString, Point};
use regex::Regex;

use crate::linear::LinearSystem;

/// A sampled point along a line, at a position already expressed in total yards
#[derive(Debug, Clone, PartialEq)]
pub struct LineSample {
    pub elr: String,
    pub total_yards: i64,
    /// Easting / northing in the shared projected CRS (metres)
    pub location: Point<f64>,
}

impl LineSample {
    pub fn new(elr: impl Into<String>, total_yards: i64, easting: f64, northing: f64) -> Self {
        Self {
            elr: elr.into(),
            total_yards,
            location: Point::new(easting, northing),
        }
    }
}

/// A line centreline with its reported extents
#[derive(Debug, Clone)]
pub struct Centreline {
    pub elr: String,
    pub system: LinearSystem,
    pub total_yards_from: i64,
    pub total_yards_to: i64,
    pub shape_length_m: Option<f64>,
    /// Oriented in mileage direction
    pub geometry: MultiLineString<f64>,
}

/// A milepost (waymark) calibrating a reported position against the ground
#[derive(Debug, Clone)]
pub struct Milepost {
    pub elr: String,
    pub total_yards: i64,
    pub location: Point<f64>,
}

fn elr_regex() -> &'static Regex {
    static ELR: OnceLock<Regex> = OnceLock::new();
    ELR.get_or_init(|| Regex::new(r"^[A-Z]{3}\d?$").expect("ELR pattern is valid"))
}

/// Whether a code looks like an engineering line reference: three capitals and an
/// optional digit.
pub fn is_valid_elr(elr: &str) -> bool {
    elr_regex().is_match(elr)
}
