//! Hand-off to the SQL-driven normalization step.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{Config, ResolutionPaths};
use crate::external::{CommandRunner, ExternalCommand};

/// Raw CSV name the SQL script is written against; replaced with the real one.
pub const RAW_CSV_PLACEHOLDER: &str = "furlong_gazetteer_0022y_raw.csv";

/// Aggregated CSV name the aggregation SQL script is written against
pub const AGGREGATED_CSV_PLACEHOLDER: &str = "furlong_gazetteer_aggregated.csv";

/// `sqlite3 -bail <store>` fed with the script, run from the CSV's directory.
///
/// The script refers to the CSV by `placeholder`, which is replaced with the CSV's
/// file name. The store is named relative to that same directory.
pub fn sqlite_load_command(
    sqlite3: &str,
    script: &str,
    placeholder: &str,
    csv: &Path,
    store: &Path,
) -> Result<ExternalCommand> {
    let csv_name = csv
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid CSV path {}", csv.display()))?;
    let sql = script.replace(placeholder, csv_name);

    let dir = csv.parent().filter(|d| !d.as_os_str().is_empty());
    let store_arg = store_argument(dir, store)?;

    let mut command = ExternalCommand::new(sqlite3).arg("-bail").arg(store_arg).stdin(sql);
    if let Some(dir) = dir {
        command = command.current_dir(dir);
    }
    Ok(command)
}

fn store_argument(dir: Option<&Path>, store: &Path) -> Result<PathBuf> {
    let Some(dir) = dir else {
        return Ok(store.to_path_buf());
    };
    match (store.parent(), store.file_name()) {
        (Some(parent), Some(name)) if parent == dir => Ok(PathBuf::from(name)),
        _ => std::path::absolute(store)
            .with_context(|| format!("Invalid store path {}", store.display())),
    }
}

/// `sqlite3` invocation loading the raw gazetteer CSV into its store
pub fn normalize_command(
    sqlite3: &str,
    script: &str,
    raw_csv: &Path,
    store: &Path,
) -> Result<ExternalCommand> {
    sqlite_load_command(sqlite3, script, RAW_CSV_PLACEHOLDER, raw_csv, store)
}

/// Read a SQL script and run it through `sqlite3` against `store`
pub fn load_into_store(
    runner: &dyn CommandRunner,
    config: &Config,
    script_path: &Path,
    placeholder: &str,
    csv: &Path,
    store: &Path,
) -> Result<()> {
    info!("Optimising gazetteer tables into {}", store.display());

    let script = fs::read_to_string(script_path).with_context(|| {
        format!(
            "Failed to read normalization script {}",
            script_path.display()
        )
    })?;

    let command = sqlite_load_command(&config.build.sqlite3, &script, placeholder, csv, store)?;
    runner
        .run(&command)
        .context("Failed to create gazetteer database")?;
    Ok(())
}

/// Build the indexed store from the raw CSV
pub fn normalize(
    runner: &dyn CommandRunner,
    config: &Config,
    paths: &ResolutionPaths,
) -> Result<()> {
    load_into_store(
        runner,
        config,
        &config.paths.normalize_script,
        RAW_CSV_PLACEHOLDER,
        &paths.raw_csv,
        &paths.store,
    )
}
