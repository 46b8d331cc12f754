//! Aggregated gazetteer: consecutive samples of a line sharing the same region,
//! administrative area or nearest place collapse into one from/to range.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use hashbrown::HashSet;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::assemble::read_csv;
use super::normalize::{load_into_store, AGGREGATED_CSV_PLACEHOLDER};
use crate::config::{Config, Resolution};
use crate::datasets::load_centrelines;
use crate::external::CommandRunner;
use crate::files::{check_files_exist, remove_file_if_exists};
use crate::linear::{format_total_yards, LinearSystem};
use crate::models::{Centreline, GazetteerRecord};

/// Group of network region ranges
pub const REGION_GROUP: u8 = 1;
/// Group of country and administrative area ranges
pub const ADMIN_AREA_GROUP: u8 = 2;
/// Group of district and nearest place ranges, with distance statistics
pub const PLACE_GROUP: u8 = 3;

pub const AGGREGATE_COLUMNS: [&str; 11] = [
    "elr",
    "group_id",
    "offset_from",
    "offset_to",
    "mileage_from",
    "mileage_to",
    "value_1",
    "value_2",
    "min_distance",
    "max_distance",
    "mean_distance",
];

/// Place distance statistics over a range, in metres
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceStats {
    pub min: i64,
    pub max: i64,
    /// Rounded half away from zero
    pub mean: i64,
}

/// A run of consecutive samples with the same value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateGroup {
    pub from: i64,
    pub to: i64,
    pub value: (String, String),
    pub distances: Option<DistanceStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateRow {
    pub elr: String,
    pub group_id: u8,
    pub offset_from: i64,
    pub offset_to: i64,
    pub mileage_from: String,
    pub mileage_to: String,
    pub value_1: String,
    pub value_2: Option<String>,
    pub min_distance: Option<i64>,
    pub max_distance: Option<i64>,
    pub mean_distance: Option<i64>,
}

#[derive(Default)]
struct DistanceAccumulator {
    min: i64,
    max: i64,
    sum: i64,
    count: i64,
}

impl DistanceAccumulator {
    fn add(&mut self, distance: Option<i64>) {
        let Some(d) = distance else { return };
        if self.count == 0 {
            self.min = d;
            self.max = d;
        } else {
            self.min = self.min.min(d);
            self.max = self.max.max(d);
        }
        self.sum += d;
        self.count += 1;
    }

    fn stats(&self) -> Option<DistanceStats> {
        (self.count > 0).then(|| DistanceStats {
            min: self.min,
            max: self.max,
            mean: (self.sum as f64 / self.count as f64).round() as i64,
        })
    }
}

struct Run {
    group: AggregateGroup,
    distances: DistanceAccumulator,
}

impl Run {
    fn start(from: i64, record: &GazetteerRecord, value: (String, String)) -> Self {
        let mut distances = DistanceAccumulator::default();
        distances.add(record.distance_to_place_m);
        Self {
            group: AggregateGroup {
                from,
                to: record.total_yards,
                value,
                distances: None,
            },
            distances,
        }
    }

    fn extend(&mut self, record: &GazetteerRecord) {
        if record.total_yards > self.group.to {
            self.group.to = record.total_yards;
        }
        self.distances.add(record.distance_to_place_m);
    }

    fn finish(mut self) -> AggregateGroup {
        self.group.distances = self.distances.stats();
        self.group
    }
}

/// Collapse one line's records (sorted by total yards) into runs of equal value.
///
/// Where the value changes between samples at `a` and `b`, the boundary is placed
/// midway: the old run ends at `(a + b) / 2 - 1` and the new one starts at
/// `(a + b) / 2`.
pub fn group_runs<F>(records: &[GazetteerRecord], value_of: F) -> Vec<AggregateGroup>
where
    F: Fn(&GazetteerRecord) -> (String, String),
{
    let mut groups = Vec::new();
    let mut current: Option<Run> = None;

    for record in records {
        let value = value_of(record);

        match current.as_mut() {
            Some(run) if run.group.value == value => {
                run.extend(record);
                continue;
            }
            _ => {}
        }

        let from = match current.take() {
            Some(mut run) => {
                let boundary = (run.group.to + record.total_yards) / 2;
                run.group.to = boundary - 1;
                groups.push(run.finish());
                boundary
            }
            None => record.total_yards,
        };
        current = Some(Run::start(from, record, value));
    }

    if let Some(run) = current {
        groups.push(run.finish());
    }
    groups
}

/// ELRs whose positions are reported in kilometres
pub fn metric_elrs(centrelines: &[Centreline]) -> HashSet<String> {
    centrelines
        .iter()
        .filter(|c| c.system.is_metric())
        .map(|c| c.elr.clone())
        .collect()
}

/// Aggregate a gazetteer sorted by `(elr, total_yards)`
pub fn aggregate(records: &[GazetteerRecord], metric: &HashSet<String>) -> Vec<AggregateRow> {
    let mut rows = Vec::new();

    for line in records.chunk_by(|a, b| a.elr == b.elr) {
        let elr = &line[0].elr;
        let system = if metric.contains(elr) {
            LinearSystem::Metric
        } else {
            LinearSystem::Imperial
        };

        let text = |r: &Option<String>| r.clone().unwrap_or_default();

        let regions = group_runs(line, |r| (text(&r.region_name), String::new()));
        rows.extend(regions.into_iter().map(|g| to_row(elr, REGION_GROUP, system, g, false)));

        let areas = group_runs(line, |r| (text(&r.country), text(&r.admin_area)));
        rows.extend(areas.into_iter().map(|g| to_row(elr, ADMIN_AREA_GROUP, system, g, true)));

        let places = group_runs(line, |r| (text(&r.district), text(&r.place_name)));
        rows.extend(places.into_iter().map(|g| to_row(elr, PLACE_GROUP, system, g, true)));
    }

    rows
}

fn to_row(
    elr: &str,
    group_id: u8,
    system: LinearSystem,
    group: AggregateGroup,
    paired: bool,
) -> AggregateRow {
    let stats = if group_id == PLACE_GROUP {
        group.distances
    } else {
        None
    };
    let (value_1, value_2) = group.value;
    AggregateRow {
        elr: elr.to_string(),
        group_id,
        offset_from: group.from,
        offset_to: group.to,
        mileage_from: format_total_yards(group.from, system),
        mileage_to: format_total_yards(group.to, system),
        value_1,
        value_2: paired.then_some(value_2),
        min_distance: stats.map(|s| s.min),
        max_distance: stats.map(|s| s.max),
        mean_distance: stats.map(|s| s.mean),
    }
}

/// Files written by an aggregation
#[derive(Debug, Clone)]
pub struct AggregateSummary {
    pub ranges: usize,
    pub csv: PathBuf,
    /// Absent without an aggregation script or with normalization switched off
    pub store: Option<PathBuf>,
}

/// Aggregate the raw gazetteer at `resolution` into the aggregated CSV, then load
/// it into its own store when an aggregation script is configured.
///
/// The centreline store decides which lines have their ranges shown in kilometres.
/// On failure both outputs are removed.
pub fn write_aggregated_gazetteer(
    runner: &dyn CommandRunner,
    config: &Config,
    resolution: Resolution,
) -> Result<AggregateSummary> {
    info!("Aggregating gazetteer at {} resolution", resolution);

    let csv = config.aggregated_csv();
    let store = config.aggregated_store();
    remove_file_if_exists(&csv)?;
    remove_file_if_exists(&store)?;

    let result = aggregate_into(runner, config, resolution, &csv, &store);
    if result.is_err() {
        for path in [&csv, &store] {
            if let Err(e) = remove_file_if_exists(path) {
                warn!("Failed to remove partial output: {:#}", e);
            }
        }
    }
    result
}

fn aggregate_into(
    runner: &dyn CommandRunner,
    config: &Config,
    resolution: Resolution,
    csv: &Path,
    store: &Path,
) -> Result<AggregateSummary> {
    let raw_csv = config.resolution_paths(resolution).raw_csv;
    let stores = config.spatial_stores();
    check_files_exist([&raw_csv, &stores.centrelines])?;

    let metric = metric_elrs(&load_centrelines(&stores.centrelines)?);
    let records = read_csv(&raw_csv)?;
    let rows = aggregate(&records, &metric);

    write_aggregated_csv(csv, &rows)?;
    info!("Wrote {} aggregated ranges", rows.len());

    let loaded = match &config.paths.aggregate_script {
        Some(script) if config.build.normalize => {
            load_into_store(runner, config, script, AGGREGATED_CSV_PLACEHOLDER, csv, store)?;
            Some(store.to_path_buf())
        }
        _ => None,
    };

    Ok(AggregateSummary {
        ranges: rows.len(),
        csv: csv.to_path_buf(),
        store: loaded,
    })
}

pub fn write_aggregated_csv(path: &Path, rows: &[AggregateRow]) -> Result<()> {
    info!("Saving aggregated gazetteer as CSV: {}", path.display());
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_aggregate_rows(file, rows).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn write_aggregate_rows<W: Write>(writer: W, rows: &[AggregateRow]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(AGGREGATE_COLUMNS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
