//! Core data models for the gazetteer build.

pub mod area;
pub mod line;
pub mod place;
pub mod record;

pub use area::{AdminArea, Region};
pub use line::{is_valid_elr, Centreline, LineSample, Milepost};
pub use place::Place;
pub use record::GazetteerRecord;
