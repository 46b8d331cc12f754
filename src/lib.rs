//! Furlong - A railway linear-referencing gazetteer builder
//!
//! This library provides the shared types and build steps for the convert and build binaries.

pub mod config;
pub mod conversion;
pub mod datasets;
pub mod error;
pub mod external;
pub mod files;
pub mod gazetteer;
pub mod linear;
pub mod models;
pub mod pip;
pub mod pipeline;

pub use config::{Config, Resolution};
pub use error::BuildError;
pub use linear::LinearSystem;
pub use models::GazetteerRecord;
