//! Flattening, sorting and serializing the enriched samples.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

use crate::models::GazetteerRecord;
use crate::pipeline::EnrichedSample;

/// Drop geometry and join bookkeeping, then sort by `(elr, total_yards)`.
///
/// The sort is stable, so samples sharing a key keep their input order.
pub fn assemble(enriched: Vec<EnrichedSample>) -> Vec<GazetteerRecord> {
    info!("Sorting gazetteer by ELR and mileage");

    let mut records: Vec<GazetteerRecord> = enriched
        .into_iter()
        .map(|row| {
            let (place_name, district, county_unitary, distance_to_place_m) = match row.place {
                Some(p) => (Some(p.name), p.district, p.county_unitary, Some(p.distance_m)),
                None => (None, None, None, None),
            };
            let (country, admin_area) = match row.admin {
                Some(a) => (a.country, a.admin_area),
                None => (None, None),
            };
            GazetteerRecord {
                elr: row.sample.elr,
                total_yards: row.sample.total_yards,
                region_name: row.region,
                place_name,
                district,
                county_unitary,
                distance_to_place_m,
                country,
                admin_area,
            }
        })
        .collect();

    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    records
}

/// Write the raw gazetteer CSV
pub fn write_csv(path: &Path, records: &[GazetteerRecord]) -> Result<()> {
    info!("Saving gazetteer as CSV: {}", path.display());
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(file, records).with_context(|| format!("Failed to write {}", path.display()))
}

/// Header first (even with no rows), then one row per record
pub fn write_records<W: Write>(writer: W, records: &[GazetteerRecord]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(GazetteerRecord::COLUMNS)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read a raw gazetteer CSV back
pub fn read_csv(path: &Path) -> Result<Vec<GazetteerRecord>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_records(file).with_context(|| format!("Failed to read {}", path.display()))
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<GazetteerRecord>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let records = csv_reader
        .deserialize()
        .collect::<std::result::Result<Vec<GazetteerRecord>, _>>()?;
    Ok(records)
}
