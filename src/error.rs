//! Build error types.

use std::path::PathBuf;

/// Fatal build failures that callers may want to tell apart.
///
/// Everything else (unreadable stores, malformed CSV) travels as `anyhow::Error`
/// with file context attached.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// One or more required input files are absent
    #[error("required input files missing: {}", display_paths(.0))]
    MissingInputs(Vec<PathBuf>),

    /// An external tool could not be started
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran but reported failure
    #[error("{program} failed ({status}): {message}")]
    ExternalProcess {
        program: String,
        status: String,
        message: String,
    },
}

impl BuildError {
    /// Paths reported by a missing-input failure
    pub fn missing_paths(&self) -> Option<&[PathBuf]> {
        match self {
            BuildError::MissingInputs(paths) => Some(paths),
            _ => None,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
