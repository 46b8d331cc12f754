//! Centreline and milepost loaders.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use super::features::{read_features, RawFeature};
use crate::linear::{miles_yards_to_total_yards, to_total_yards, LinearSystem};
use crate::models::{is_valid_elr, Centreline, Milepost};

pub fn load_centrelines(path: &Path) -> Result<Vec<Centreline>> {
    info!("Loading line centrelines");
    Ok(centrelines_from_features(read_features(path)?))
}

pub fn load_mileposts(path: &Path) -> Result<Vec<Milepost>> {
    info!("Loading mileposts");
    Ok(mileposts_from_features(read_features(path)?))
}

/// Centreline extents are reported in miles.yards for every line, metric ones
/// included, so both ends convert as imperial whatever the line's system.
pub fn centrelines_from_features(features: Vec<RawFeature>) -> Vec<Centreline> {
    let total = features.len();
    let centrelines: Vec<Centreline> = features
        .iter()
        .filter_map(|f| {
            let system = LinearSystem::from_tag(f.string("L_SYSTEM").as_deref().unwrap_or(""));
            Some(Centreline {
                elr: f.string("ELR")?,
                system,
                total_yards_from: miles_yards_to_total_yards(f.number("L_M_FROM")?),
                total_yards_to: miles_yards_to_total_yards(f.number("L_M_TO")?),
                shape_length_m: f.number("SHAPE_LEN"),
                geometry: f.multi_line_string()?,
            })
        })
        .collect();

    info!("Loaded {} centrelines", centrelines.len());
    if centrelines.len() < total {
        warn!(
            "Skipped {} centrelines lacking ELR, extents or geometry",
            total - centrelines.len()
        );
    }
    warn_invalid_elrs(centrelines.iter().map(|c| c.elr.as_str()));
    centrelines
}

/// Milepost values are in miles.yards or kilometres, per their own system tag.
pub fn mileposts_from_features(features: Vec<RawFeature>) -> Vec<Milepost> {
    let total = features.len();
    let mileposts: Vec<Milepost> = features
        .iter()
        .filter_map(|f| {
            let system = LinearSystem::from_tag(f.string("M_SYSTEM").as_deref().unwrap_or(""));
            Some(Milepost {
                elr: f.string("ELR")?,
                total_yards: to_total_yards(system, f.number("WAYMARK_VA")?),
                location: f.point()?,
            })
        })
        .collect();

    info!("Loaded {} mileposts", mileposts.len());
    if mileposts.len() < total {
        warn!(
            "Skipped {} mileposts lacking ELR, value or geometry",
            total - mileposts.len()
        );
    }
    mileposts
}

pub(crate) fn warn_invalid_elrs<'a>(elrs: impl Iterator<Item = &'a str>) {
    let mut invalid: Vec<&str> = elrs.filter(|elr| !is_valid_elr(elr)).collect();
    if invalid.is_empty() {
        return;
    }
    invalid.sort_unstable();
    invalid.dedup();
    warn!(
        "{} unexpected ELR codes, e.g. {}",
        invalid.len(),
        invalid.iter().take(5).copied().collect::<Vec<_>>().join(", ")
    );
}
