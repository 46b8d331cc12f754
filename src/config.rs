//! Build configuration.
//!
//! Read once per process from a TOML file and passed explicitly to every component.
//! Path values may contain `${root_dir}`, replaced by the project root (normally the
//! `FURLONG_ROOT` environment variable).

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::pip::ContainmentPolicy;

/// Environment variable naming the project root
pub const ROOT_ENV_VAR: &str = "FURLONG_ROOT";

/// Placeholder substituted with the project root
pub const ROOT_PLACEHOLDER: &str = "${root_dir}";

/// Prefix shared by every generated file name
pub const FILE_PREFIX: &str = "furlong";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    pub paths: PathsConfig,
    pub sources: SourcesConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    /// Precomputed line samples, one CSV per resolution
    pub precompute_dir: PathBuf,
    /// Gazetteer outputs
    pub gazetteer_dir: PathBuf,
    /// Converted spatial stores (GeoJSON) and derived tables
    pub spatial_dir: PathBuf,
    /// SQL script building the normalized gazetteer store
    pub normalize_script: PathBuf,
    /// SQL script loading the aggregated gazetteer into its own store
    #[serde(default)]
    pub aggregate_script: Option<PathBuf>,
}

/// Source shapefiles handed to the geometry conversion tool
#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    pub centrelines: PathBuf,
    pub mileposts: PathBuf,
    pub regions: PathBuf,
    pub places: PathBuf,
    pub admin_areas: PathBuf,
    /// ELRs excluded from centreline and milepost conversion
    #[serde(default)]
    pub skip_elrs: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuildConfig {
    #[serde(default)]
    pub containment_policy: ContainmentPolicy,
    #[serde(default = "default_ogr2ogr")]
    pub ogr2ogr: String,
    #[serde(default = "default_sqlite3")]
    pub sqlite3: String,
    /// Run the SQL normalization step after writing the raw CSV
    #[serde(default = "default_true")]
    pub normalize: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            containment_policy: ContainmentPolicy::default(),
            ogr2ogr: default_ogr2ogr(),
            sqlite3: default_sqlite3(),
            normalize: true,
        }
    }
}

fn default_version() -> String {
    "unversioned".to_string()
}

fn default_ogr2ogr() -> String {
    "ogr2ogr".to_string()
}

fn default_sqlite3() -> String {
    "sqlite3".to_string()
}

fn default_true() -> bool {
    true
}

fn expand_path(path: &Path, root: Option<&Path>) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    if !text.contains(ROOT_PLACEHOLDER) {
        return Ok(path.to_path_buf());
    }
    let Some(root) = root else {
        bail!(
            "config path {} refers to {} but no root was given (set {})",
            text,
            ROOT_PLACEHOLDER,
            ROOT_ENV_VAR
        );
    };

    match text.strip_prefix(ROOT_PLACEHOLDER) {
        Some(rest) if !rest.contains(ROOT_PLACEHOLDER) => {
            Ok(root.join(rest.trim_start_matches(['/', '\\'])))
        }
        _ => Ok(PathBuf::from(
            text.replace(ROOT_PLACEHOLDER, &root.to_string_lossy()),
        )),
    }
}

/// Converted spatial stores read by the dataset loaders
#[derive(Debug, Clone)]
pub struct SpatialStores {
    pub centrelines: PathBuf,
    pub mileposts: PathBuf,
    pub regions: PathBuf,
    pub places: PathBuf,
    pub admin_areas: PathBuf,
}

/// Input and output files for one gazetteer resolution
#[derive(Debug, Clone)]
pub struct ResolutionPaths {
    pub samples: PathBuf,
    pub raw_csv: PathBuf,
    pub store: PathBuf,
}

impl Config {
    /// Load from a file, substituting `${root_dir}` with `root` when given.
    pub fn load_from_file<P: AsRef<Path>>(path: P, root: Option<&Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content, root)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(content: &str, root: Option<&Path>) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.expand_root(root)?;
        Ok(config)
    }

    // The root goes into the parsed paths, never into the TOML text
    fn expand_root(&mut self, root: Option<&Path>) -> Result<()> {
        let paths = &mut self.paths;
        let sources = &mut self.sources;
        let fields = [
            &mut paths.precompute_dir,
            &mut paths.gazetteer_dir,
            &mut paths.spatial_dir,
            &mut paths.normalize_script,
            &mut sources.centrelines,
            &mut sources.mileposts,
            &mut sources.regions,
            &mut sources.places,
            &mut sources.admin_areas,
        ];

        for path in fields.into_iter().chain(paths.aggregate_script.as_mut()) {
            *path = expand_path(path, root)?;
        }
        Ok(())
    }

    pub fn spatial_stores(&self) -> SpatialStores {
        let dir = &self.paths.spatial_dir;
        SpatialStores {
            centrelines: dir.join("centrelines.geojson"),
            mileposts: dir.join("mileposts.geojson"),
            regions: dir.join("regions.geojson"),
            places: dir.join("places.geojson"),
            admin_areas: dir.join("admin_areas.geojson"),
        }
    }

    pub fn resolution_paths(&self, resolution: Resolution) -> ResolutionPaths {
        ResolutionPaths {
            samples: self
                .paths
                .precompute_dir
                .join(format!("{}_precomputed_{}.csv", FILE_PREFIX, resolution)),
            raw_csv: self
                .paths
                .gazetteer_dir
                .join(format!("{}_gazetteer_{}_raw.csv", FILE_PREFIX, resolution)),
            store: self
                .paths
                .gazetteer_dir
                .join(format!("{}_gazetteer_{}.sqlite", FILE_PREFIX, resolution)),
        }
    }

    pub fn aggregated_csv(&self) -> PathBuf {
        self.paths
            .gazetteer_dir
            .join(format!("{}_gazetteer_aggregated.csv", FILE_PREFIX))
    }

    pub fn aggregated_store(&self) -> PathBuf {
        self.paths
            .gazetteer_dir
            .join(format!("{}_gazetteer_aggregated.sqlite", FILE_PREFIX))
    }

    /// Normalized centreline table written by the conversion step
    pub fn centrelines_csv(&self) -> PathBuf {
        self.paths.spatial_dir.join("centrelines.csv")
    }

    /// Normalized milepost table written by the conversion step
    pub fn mileposts_csv(&self) -> PathBuf {
        self.paths.spatial_dir.join("mileposts.csv")
    }
}

/// Sampling interval in yards; displays zero-padded to four digits (`0022y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Resolution(u32);

impl Resolution {
    pub fn new(yards: u32) -> Option<Self> {
        (yards > 0).then_some(Self(yards))
    }

    pub fn yards(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}y", self.0)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let yards: u32 = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid resolution '{}': {}", s, e))?;
        Resolution::new(yards).ok_or_else(|| "resolution must be a positive number of yards".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        version = "2024.1"

        [paths]
        precompute_dir = "${root_dir}/precompute"
        gazetteer_dir = "${root_dir}/gazetteer"
        spatial_dir = "${root_dir}/spatial"
        normalize_script = "${root_dir}/sql/gazetteer_create.sql"

        [sources]
        centrelines = "${root_dir}/source/NWR_ELRs.shp"
        mileposts = "${root_dir}/source/NWR_Waymarks.shp"
        regions = "${root_dir}/source/NWR_Regions.shp"
        places = "${root_dir}/source/OS_Places.shp"
        admin_areas = "${root_dir}/source/OS_Admin.shp"
        skip_elrs = ["XYZ", "ABC9"]

        [build]
        containment_policy = "smallest_area"
    "#;

    #[test]
    fn test_root_substitution() {
        let config = Config::parse(SAMPLE, Some(Path::new("/data/furlong"))).unwrap();
        assert_eq!(config.version, "2024.1");
        assert_eq!(
            config.paths.precompute_dir,
            PathBuf::from("/data/furlong/precompute")
        );
        assert_eq!(config.sources.skip_elrs, vec!["XYZ", "ABC9"]);
        assert_eq!(
            config.build.containment_policy,
            ContainmentPolicy::SmallestArea
        );
        assert_eq!(config.build.sqlite3, "sqlite3");
        assert!(config.build.normalize);
    }

    #[test]
    fn test_root_with_toml_special_characters() {
        let root = Path::new(r#"C:\Users\o"brien\furlong"#);
        let config = Config::parse(SAMPLE, Some(root)).unwrap();
        assert_eq!(config.paths.gazetteer_dir, root.join("gazetteer"));
        assert_eq!(
            config.sources.admin_areas,
            root.join("source/OS_Admin.shp")
        );
    }

    #[test]
    fn test_aggregate_script_optional() {
        let config = Config::parse(SAMPLE, Some(Path::new("/r"))).unwrap();
        assert!(config.paths.aggregate_script.is_none());

        let with_script = SAMPLE.replace(
            "[sources]",
            "aggregate_script = \"${root_dir}/sql/aggregated.sql\"\n\n        [sources]",
        );
        let config = Config::parse(&with_script, Some(Path::new("/r"))).unwrap();
        assert_eq!(
            config.paths.aggregate_script,
            Some(PathBuf::from("/r/sql/aggregated.sql"))
        );
        assert_eq!(
            config.aggregated_store(),
            PathBuf::from("/r/gazetteer/furlong_gazetteer_aggregated.sqlite")
        );
    }

    #[test]
    fn test_placeholder_without_root_fails() {
        assert!(Config::parse(SAMPLE, None).is_err());
    }

    #[test]
    fn test_resolution_file_names() {
        let config = Config::parse(SAMPLE, Some(Path::new("/r"))).unwrap();
        let paths = config.resolution_paths(Resolution::new(22).unwrap());
        assert_eq!(
            paths.samples,
            PathBuf::from("/r/precompute/furlong_precomputed_0022y.csv")
        );
        assert_eq!(
            paths.raw_csv,
            PathBuf::from("/r/gazetteer/furlong_gazetteer_0022y_raw.csv")
        );
        assert_eq!(
            paths.store,
            PathBuf::from("/r/gazetteer/furlong_gazetteer_0022y.sqlite")
        );

        let paths = config.resolution_paths(Resolution::new(8800).unwrap());
        assert!(paths.raw_csv.ends_with("furlong_gazetteer_8800y_raw.csv"));
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!("22".parse::<Resolution>().unwrap().yards(), 22);
        assert!("0".parse::<Resolution>().is_err());
        assert!("-5".parse::<Resolution>().is_err());
        assert!("chain".parse::<Resolution>().is_err());
        assert_eq!(Resolution::new(1760).unwrap().to_string(), "1760y");
    }
}
