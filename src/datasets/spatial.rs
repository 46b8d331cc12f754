//! Region, place and administrative area loaders.
//!
//! Only the attributes the gazetteer needs are read; identifier and area/length
//! columns of the sources are left behind. Ambiguous source names are mapped onto
//! canonical ones (the network `REGION_NAM` becomes the region name, kept apart from
//! the country and admin-area names of the administrative dataset). Polygons are
//! kept whenever they have geometry; a missing name is carried as an empty value.

use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

use super::features::{read_features, RawFeature};
use crate::models::place::canonical_place_name;
use crate::models::{AdminArea, Place, Region};

pub fn load_regions(path: &Path) -> Result<Vec<Region>> {
    info!("Loading regions");
    Ok(regions_from_features(read_features(path)?))
}

pub fn load_places(path: &Path) -> Result<Vec<Place>> {
    info!("Loading populated places");
    Ok(places_from_features(read_features(path)?))
}

pub fn load_admin_areas(path: &Path) -> Result<Vec<AdminArea>> {
    info!("Loading administrative areas");
    Ok(admin_areas_from_features(read_features(path)?))
}

pub fn regions_from_features(features: Vec<RawFeature>) -> Vec<Region> {
    let total = features.len();
    let regions: Vec<Region> = features
        .iter()
        .filter_map(|f| {
            Some(Region {
                name: f.string("REGION_NAM"),
                geometry: f.multi_polygon()?,
            })
        })
        .collect();

    report("regions", regions.len(), total);
    regions
}

pub fn places_from_features(features: Vec<RawFeature>) -> Vec<Place> {
    let total = features.len();
    let places: Vec<Place> = features
        .iter()
        .filter_map(|f| {
            let alt_lang = f.string("NAME2_LANG");
            let name = canonical_place_name(
                f.string("NAME1")?,
                f.string("NAME2"),
                alt_lang.as_deref(),
            );
            Some(Place {
                name,
                district: f.string("DISTRICT_B"),
                county_unitary: f.string("COUNTY_UNI"),
                location: f.point()?,
            })
        })
        .collect();

    report("places", places.len(), total);
    places
}

pub fn admin_areas_from_features(features: Vec<RawFeature>) -> Vec<AdminArea> {
    let total = features.len();
    let areas: Vec<AdminArea> = features
        .iter()
        .filter_map(|f| {
            Some(AdminArea {
                country: f.string("NAME_1"),
                admin_area: f.string("NAME_2"),
                geometry: f.multi_polygon()?,
            })
        })
        .collect();

    report("administrative areas", areas.len(), total);
    areas
}

fn report(what: &str, loaded: usize, total: usize) {
    info!("Loaded {} {}", loaded, what);
    if loaded < total {
        warn!(
            "Skipped {} {} lacking required attributes or geometry",
            total - loaded,
            what
        );
    }
}
