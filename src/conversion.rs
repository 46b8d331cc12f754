//! Conversion of the source shapefiles into the spatial stores.
//!
//! `ogr2ogr` does the format work; this module decides what to run and then
//! derives the centreline and milepost tables from the converted stores.

use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::datasets::{load_centrelines, load_mileposts};
use crate::external::{CommandRunner, ExternalCommand};
use crate::files::{check_files_exist, remove_file_if_exists};
use crate::linear::LinearSystem;
use crate::models::{Centreline, Milepost};

/// One shapefile to convert
#[derive(Debug, Clone)]
pub struct Conversion {
    pub name: &'static str,
    pub source: PathBuf,
    pub output: PathBuf,
    pub command: ExternalCommand,
}

/// `-where` clause excluding the given ELRs, if any
pub fn skip_elrs_filter(skip_elrs: &[String]) -> Option<String> {
    if skip_elrs.is_empty() {
        return None;
    }
    let quoted: Vec<String> = skip_elrs
        .iter()
        .map(|elr| format!("'{}'", elr.replace('\'', "''")))
        .collect();
    Some(format!("ELR NOT IN ({})", quoted.join(", ")))
}

fn ogr2ogr(program: &str, source: &Path, output: &Path, filter: Option<&str>) -> ExternalCommand {
    let mut command = ExternalCommand::new(program).args(["-f", "GeoJSON", "-dim", "XY"]);
    if let Some(filter) = filter {
        command = command.arg("-where").arg(filter);
    }
    command.arg(output).arg(source)
}

/// The five conversions in the order they run
pub fn conversion_commands(config: &Config) -> Vec<Conversion> {
    let sources = &config.sources;
    let stores = config.spatial_stores();
    let filter = skip_elrs_filter(&sources.skip_elrs);
    let program = config.build.ogr2ogr.as_str();

    [
        ("centrelines", &sources.centrelines, stores.centrelines, filter.as_deref()),
        ("mileposts", &sources.mileposts, stores.mileposts, filter.as_deref()),
        ("regions", &sources.regions, stores.regions, None),
        ("places", &sources.places, stores.places, None),
        ("admin areas", &sources.admin_areas, stores.admin_areas, None),
    ]
    .into_iter()
    .map(|(name, source, output, filter)| Conversion {
        name,
        source: source.clone(),
        command: ogr2ogr(program, source, &output, filter),
        output,
    })
    .collect()
}

/// Convert every source, then write the centreline and milepost tables
pub fn convert_sources(runner: &dyn CommandRunner, config: &Config) -> Result<()> {
    let sources = &config.sources;
    check_files_exist([
        &sources.centrelines,
        &sources.mileposts,
        &sources.regions,
        &sources.places,
        &sources.admin_areas,
    ])?;

    fs::create_dir_all(&config.paths.spatial_dir).with_context(|| {
        format!(
            "Failed to create {}",
            config.paths.spatial_dir.display()
        )
    })?;

    for conversion in conversion_commands(config) {
        info!(
            "Converting {} from {}",
            conversion.name,
            conversion.source.display()
        );
        remove_file_if_exists(&conversion.output)?;
        runner
            .run(&conversion.command)
            .with_context(|| format!("Failed to convert {}", conversion.name))?;
    }

    let stores = config.spatial_stores();
    let centrelines = load_centrelines(&stores.centrelines)?;
    write_table(&config.centrelines_csv(), |w| write_centrelines(w, &centrelines))?;

    let mileposts = load_mileposts(&stores.mileposts)?;
    write_table(&config.mileposts_csv(), |w| write_mileposts(w, &mileposts))?;

    info!(
        "Wrote {} centrelines and {} mileposts",
        centrelines.len(),
        mileposts.len()
    );
    Ok(())
}

fn write_table<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    remove_file_if_exists(path)?;
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write(file).with_context(|| format!("Failed to write {}", path.display()))
}

#[derive(Serialize)]
struct CentrelineRow<'a> {
    elr: &'a str,
    linear_system: LinearSystem,
    total_yards_from: i64,
    total_yards_to: i64,
    shape_length_m: Option<f64>,
}

#[derive(Serialize)]
struct MilepostRow<'a> {
    elr: &'a str,
    total_yards: i64,
    easting: f64,
    northing: f64,
}

pub fn write_centrelines<W: Write>(writer: W, centrelines: &[Centreline]) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    for c in centrelines {
        csv_writer.serialize(CentrelineRow {
            elr: &c.elr,
            linear_system: c.system,
            total_yards_from: c.total_yards_from,
            total_yards_to: c.total_yards_to,
            shape_length_m: c.shape_length_m,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_mileposts<W: Write>(writer: W, mileposts: &[Milepost]) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);
    for m in mileposts {
        csv_writer.serialize(MilepostRow {
            elr: &m.elr,
            total_yards: m.total_yards,
            easting: m.location.x(),
            northing: m.location.y(),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::external::testing::RecordingRunner;
    use geo::{line_string, point, MultiLineString};

    fn config(skip: &str) -> Config {
        let toml = format!(
            r#"
[paths]
precompute_dir = "/data/precompute"
gazetteer_dir = "/data/gazetteer"
spatial_dir = "/data/spatial"
normalize_script = "/data/create.sql"

[sources]
centrelines = "/src/NWR_GTCL.shp"
mileposts = "/src/NWR_Waymarks.shp"
regions = "/src/NWR_Regions.shp"
places = "/src/OS_Places.shp"
admin_areas = "/src/GBR_adm2.shp"
skip_elrs = [{}]
"#,
            skip
        );
        Config::parse(&toml, None).unwrap()
    }

    #[test]
    fn test_skip_filter() {
        assert_eq!(skip_elrs_filter(&[]), None);
        assert_eq!(
            skip_elrs_filter(&["XYZ".to_string(), "ABC9".to_string()]).unwrap(),
            "ELR NOT IN ('XYZ', 'ABC9')"
        );
    }

    #[test]
    fn test_commands() {
        let commands = conversion_commands(&config(r#""XYZ""#));
        assert_eq!(commands.len(), 5);

        assert_eq!(
            commands[0].command.display(),
            "ogr2ogr -f GeoJSON -dim XY -where ELR NOT IN ('XYZ') \
             /data/spatial/centrelines.geojson /src/NWR_GTCL.shp"
        );
        assert!(commands[1].command.display().contains("-where"));
        assert_eq!(
            commands[4].command.display(),
            "ogr2ogr -f GeoJSON -dim XY /data/spatial/admin_areas.geojson /src/GBR_adm2.shp"
        );
    }

    #[test]
    fn test_no_filter_without_skip_list() {
        let commands = conversion_commands(&config(""));
        assert!(commands.iter().all(|c| !c.command.display().contains("-where")));
    }

    fn with_sources(config: &mut Config, dir: &Path) {
        let sources = &mut config.sources;
        for path in [
            &mut sources.centrelines,
            &mut sources.mileposts,
            &mut sources.regions,
            &mut sources.places,
            &mut sources.admin_areas,
        ] {
            let local = dir.join(path.file_name().unwrap());
            fs::write(&local, "shp").unwrap();
            *path = local;
        }
    }

    #[test]
    fn test_missing_sources_reported_before_converting() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config("");
        config.paths.spatial_dir = dir.path().join("spatial");
        with_sources(&mut config, dir.path());
        fs::remove_file(&config.sources.places).unwrap();
        fs::remove_file(&config.sources.centrelines).unwrap();

        let runner = RecordingRunner::default();
        let err = convert_sources(&runner, &config).unwrap_err();

        let build_error = err.downcast_ref::<BuildError>().unwrap();
        assert_eq!(
            build_error.missing_paths().unwrap(),
            &[config.sources.centrelines.clone(), config.sources.places.clone()]
        );
        assert!(runner.commands.borrow().is_empty());
    }

    #[test]
    fn test_failed_conversion_stops() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config("");
        config.paths.spatial_dir = dir.path().join("spatial");
        with_sources(&mut config, dir.path());

        let runner = RecordingRunner::failing("Unable to open datasource");
        let err = convert_sources(&runner, &config).unwrap_err();

        assert!(format!("{:#}", err).contains("Failed to convert centrelines"));
        assert_eq!(runner.commands.borrow().len(), 1);
    }

    #[test]
    fn test_tables() {
        let centrelines = vec![Centreline {
            elr: "CTR".to_string(),
            system: LinearSystem::Metric,
            total_yards_from: 0,
            total_yards_to: 21_120,
            shape_length_m: Some(19_312.1),
            geometry: MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]]),
        }];
        let mut out = Vec::new();
        write_centrelines(&mut out, &centrelines).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "elr,linear_system,total_yards_from,total_yards_to,shape_length_m\n\
             CTR,metric,0,21120,19312.1\n"
        );

        let mileposts = vec![Milepost {
            elr: "ABC1".to_string(),
            total_yards: 1_980,
            location: point!(x: 530_000.5, y: 180_000.0),
        }];
        let mut out = Vec::new();
        write_mileposts(&mut out, &mileposts).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "elr,total_yards,easting,northing\nABC1,1980,530000.5,180000.0\n"
        );
    }
}
