//! Point-in-Polygon (PIP) and nearest-neighbour lookups.
//!
//! Both indexes use an R-tree over envelopes, then an exact geometric test.

mod index;
mod nearest;

pub use index::{ContainmentPolicy, PolygonIndex};
pub use nearest::{Located, Nearest, NearestIndex};
