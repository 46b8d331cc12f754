//! Gazetteer build for one sampling resolution.

use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

use super::assemble::{assemble, write_csv};
use super::normalize::normalize;
use crate::config::{Config, Resolution, ResolutionPaths};
use crate::datasets::{load_admin_areas, load_places, load_regions, load_samples};
use crate::external::CommandRunner;
use crate::files::{check_files_exist, remove_file_if_exists};
use crate::pipeline::SpatialJoin;

/// What a successful build produced
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub resolution: Resolution,
    pub records: usize,
    pub raw_csv: PathBuf,
    /// Absent when normalization is switched off
    pub store: Option<PathBuf>,
}

pub struct GazetteerBuilder<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    show_progress: bool,
}

impl<'a> GazetteerBuilder<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Build the raw CSV (and normalized store) for `resolution`.
    ///
    /// Outputs of an earlier run are deleted first. On failure any partial output
    /// is removed again, so a failed build never leaves a stale gazetteer behind.
    pub fn build(&self, resolution: Resolution) -> Result<BuildSummary> {
        let started = Utc::now();
        info!("Creating gazetteer at {} resolution", resolution);

        let paths = self.config.resolution_paths(resolution);
        remove_outputs(&paths)?;

        match self.run(resolution, &paths) {
            Ok(summary) => {
                let elapsed = Utc::now() - started;
                info!(
                    "Gazetteer at {} resolution: {} records in {}s",
                    resolution,
                    summary.records,
                    elapsed.num_seconds()
                );
                Ok(summary)
            }
            Err(e) => {
                if let Err(cleanup) = remove_outputs(&paths) {
                    warn!("Failed to remove partial outputs: {:#}", cleanup);
                }
                Err(e)
            }
        }
    }

    fn run(&self, resolution: Resolution, paths: &ResolutionPaths) -> Result<BuildSummary> {
        let stores = self.config.spatial_stores();
        check_files_exist([
            &paths.samples,
            &stores.regions,
            &stores.places,
            &stores.admin_areas,
        ])?;

        let samples = load_samples(&paths.samples)?;
        let join = SpatialJoin::new(self.config.build.containment_policy)
            .with_progress(self.show_progress);

        let enriched = join.run(
            samples,
            load_regions(&stores.regions)?,
            load_places(&stores.places)?,
            load_admin_areas(&stores.admin_areas)?,
        );

        let records = assemble(enriched);
        if let Some(parent) = paths.raw_csv.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_csv(&paths.raw_csv, &records)?;

        let store = if self.config.build.normalize {
            normalize(self.runner, self.config, paths)?;
            Some(paths.store.clone())
        } else {
            info!("Skipping normalization");
            None
        };

        Ok(BuildSummary {
            resolution,
            records: records.len(),
            raw_csv: paths.raw_csv.clone(),
            store,
        })
    }
}

fn remove_outputs(paths: &ResolutionPaths) -> Result<()> {
    remove_file_if_exists(&paths.raw_csv)?;
    remove_file_if_exists(&paths.store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::external::testing::RecordingRunner;
    use crate::gazetteer::read_csv;
    use serde_json::json;
    use std::fs;
    use std::path::Path;

    fn square(min: f64, max: f64) -> serde_json::Value {
        json!({
            "type": "Polygon",
            "coordinates": [[[min, min], [max, min], [max, max], [min, max], [min, min]]]
        })
    }

    fn collection(features: Vec<serde_json::Value>) -> String {
        json!({ "type": "FeatureCollection", "features": features }).to_string()
    }

    fn setup(root: &Path, normalize: bool) -> Config {
        let toml = format!(
            r#"
version = "test"

[paths]
precompute_dir = "${{root_dir}}/precomputed"
gazetteer_dir = "${{root_dir}}/gazetteer"
spatial_dir = "${{root_dir}}/spatial"
normalize_script = "${{root_dir}}/gazetteer_create.sql"

[sources]
centrelines = "${{root_dir}}/raw/NWR_GTCL.shp"
mileposts = "${{root_dir}}/raw/NWR_Waymarks.shp"
regions = "${{root_dir}}/raw/NWR_Regions.shp"
places = "${{root_dir}}/raw/OS_Places.shp"
admin_areas = "${{root_dir}}/raw/GBR_adm2.shp"

[build]
normalize = {}
"#,
            normalize
        );
        let config = Config::parse(&toml, Some(root)).unwrap();

        for dir in ["precomputed", "gazetteer", "spatial"] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        fs::write(
            root.join("gazetteer_create.sql"),
            ".import --csv --skip 1 furlong_gazetteer_0022y_raw.csv gazetteer_raw\n",
        )
        .unwrap();

        let stores = config.spatial_stores();
        fs::write(
            &stores.regions,
            collection(vec![json!({
                "type": "Feature",
                "properties": { "REGION_NAM": "Western" },
                "geometry": square(0.0, 5000.0)
            })]),
        )
        .unwrap();
        fs::write(
            &stores.places,
            collection(vec![
                json!({
                    "type": "Feature",
                    "properties": { "NAME1": "P1", "DISTRICT_B": "D1" },
                    "geometry": { "type": "Point", "coordinates": [1030.0, 1040.0] }
                }),
                json!({
                    "type": "Feature",
                    "properties": { "NAME1": "P2", "DISTRICT_B": "D2" },
                    "geometry": { "type": "Point", "coordinates": [1000.0, 3050.0] }
                }),
            ]),
        )
        .unwrap();
        fs::write(
            &stores.admin_areas,
            collection(vec![json!({
                "type": "Feature",
                "properties": { "NAME_1": "England", "NAME_2": "Somerset" },
                "geometry": square(0.0, 5000.0)
            })]),
        )
        .unwrap();

        config
    }

    fn write_samples(config: &Config, resolution: Resolution) {
        let paths = config.resolution_paths(resolution);
        fs::write(
            paths.samples,
            "elr,total_yards,easting,northing\n\
             ABC1,200,1000.0,3100.0\n\
             ABC1,0,1000.0,1000.0\n\
             ABC1,100,1000.0,3000.0\n",
        )
        .unwrap();
    }

    #[test]
    fn test_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), true);
        let resolution: Resolution = "100".parse().unwrap();
        write_samples(&config, resolution);

        let runner = RecordingRunner::default();
        let summary = GazetteerBuilder::new(&config, &runner)
            .build(resolution)
            .unwrap();

        assert_eq!(summary.records, 3);
        assert!(summary
            .raw_csv
            .ends_with("gazetteer/furlong_gazetteer_0100y_raw.csv"));

        let records = read_csv(&summary.raw_csv).unwrap();
        let rows: Vec<(i64, &str, i64)> = records
            .iter()
            .map(|r| {
                (
                    r.total_yards,
                    r.place_name.as_deref().unwrap(),
                    r.distance_to_place_m.unwrap(),
                )
            })
            .collect();
        assert_eq!(rows, vec![(0, "P1", 50), (100, "P2", 50), (200, "P2", 50)]);
        assert!(records.iter().all(|r| r.region_name.as_deref() == Some("Western")));
        assert!(records.iter().all(|r| r.country.as_deref() == Some("England")));
        assert_eq!(records[0].district.as_deref(), Some("D1"));

        let commands = runner.commands.borrow();
        assert_eq!(commands.len(), 1);
        let sql = String::from_utf8(commands[0].stdin.clone().unwrap()).unwrap();
        assert!(sql.contains("furlong_gazetteer_0100y_raw.csv"));
    }

    #[test]
    fn test_missing_samples_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), true);
        let resolution: Resolution = "22".parse().unwrap();
        let paths = config.resolution_paths(resolution);

        let runner = RecordingRunner::default();
        let err = GazetteerBuilder::new(&config, &runner)
            .build(resolution)
            .unwrap_err();

        let build_error = err.downcast_ref::<BuildError>().unwrap();
        assert_eq!(build_error.missing_paths().unwrap(), &[paths.samples]);
        assert!(runner.commands.borrow().is_empty());
        assert!(!paths.raw_csv.exists());
        assert!(!paths.store.exists());
    }

    #[test]
    fn test_failed_normalization_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), true);
        let resolution: Resolution = "100".parse().unwrap();
        write_samples(&config, resolution);
        let paths = config.resolution_paths(resolution);
        fs::write(&paths.store, "stale").unwrap();

        let runner = RecordingRunner::failing("Error: near line 1: no such table");
        let err = GazetteerBuilder::new(&config, &runner)
            .build(resolution)
            .unwrap_err();

        assert!(format!("{:#}", err).contains("no such table"));
        assert!(!paths.raw_csv.exists());
        assert!(!paths.store.exists());
    }

    #[test]
    fn test_normalization_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), false);
        let resolution: Resolution = "100".parse().unwrap();
        write_samples(&config, resolution);

        let runner = RecordingRunner::default();
        let summary = GazetteerBuilder::new(&config, &runner)
            .build(resolution)
            .unwrap();

        assert!(summary.store.is_none());
        assert!(summary.raw_csv.exists());
        assert!(runner.commands.borrow().is_empty());
    }
}
