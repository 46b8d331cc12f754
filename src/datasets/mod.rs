//! Dataset loaders: converted spatial stores and precomputed samples into typed
//! in-memory record sets.

pub mod features;
mod line;
mod samples;
mod spatial;

pub use features::{read_features, RawFeature};
pub use line::{centrelines_from_features, load_centrelines, load_mileposts, mileposts_from_features};
pub use samples::{load_samples, read_samples};
pub use spatial::{
    admin_areas_from_features, load_admin_areas, load_places, load_regions, places_from_features,
    regions_from_features,
};
