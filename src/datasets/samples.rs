//! Precomputed line sample loader.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

use super::line::warn_invalid_elrs;
use crate::models::LineSample;

/// Columns used from the precomputed file; any others (mileage, lon/lat, grid
/// reference, accuracy) are ignored.
#[derive(Debug, Deserialize)]
struct SampleRow {
    elr: String,
    total_yards: i64,
    easting: f64,
    northing: f64,
}

pub fn load_samples(path: &Path) -> Result<Vec<LineSample>> {
    info!("Loading precomputed line samples from {}", path.display());

    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open sample file {}", path.display()))?;
    let samples = read_samples(file).with_context(|| format!("Failed to read {}", path.display()))?;

    info!("Loaded {} line samples", samples.len());
    Ok(samples)
}

pub fn read_samples<R: Read>(reader: R) -> Result<Vec<LineSample>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let mut samples = Vec::new();
    for (i, result) in csv_reader.deserialize::<SampleRow>().enumerate() {
        // Header is line 1
        let row = result.with_context(|| format!("Malformed sample on line {}", i + 2))?;
        samples.push(LineSample::new(row.elr, row.total_yards, row.easting, row.northing));
    }

    warn_invalid_elrs(samples.iter().map(|s| s.elr.as_str()));
    Ok(samples)
}
