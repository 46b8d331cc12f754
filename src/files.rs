//! File operations shared by the build steps.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::BuildError;

/// Check that every required file exists, reporting all of the absent ones at once.
pub fn check_files_exist<'a, I>(paths: I) -> Result<(), BuildError>
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    let missing: Vec<PathBuf> = paths
        .into_iter()
        .filter(|p| !p.is_file())
        .cloned()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(BuildError::MissingInputs(missing))
    }
}

/// Delete a file if present; absence is not an error.
pub fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
    }
}
