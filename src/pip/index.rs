//! Spatial index for point-in-polygon containment lookups.

use geo::{Area, BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use tracing::{debug, info};

use crate::models::area::Polygonal;

/// How a point contained by several polygons is resolved to one.
///
/// Overlapping or duplicated polygons are expected in the source data; a
/// containment join keeps exactly one match per point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentPolicy {
    /// First containing polygon in loader order. Depends on source row order.
    #[default]
    FirstInInputOrder,
    /// Containing polygon with the smallest area, then loader order
    SmallestArea,
    /// Containing polygon with the lexically smallest label, then loader order
    LexicalName,
}

/// Wrapper for R-tree indexing of a polygon item
struct IndexedPolygon {
    /// Position in the loader's row order
    order: usize,
    area: f64,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPolygon {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over polygon items, answering "which polygon contains this point"
pub struct PolygonIndex<T> {
    tree: RTree<IndexedPolygon>,
    items: Vec<T>,
    policy: ContainmentPolicy,
}

impl<T: Polygonal> PolygonIndex<T> {
    /// Build the index. Items with empty geometry are kept but never match.
    pub fn build(items: Vec<T>, policy: ContainmentPolicy) -> Self {
        info!(
            "Building spatial index for {} polygons ({:?})...",
            items.len(),
            policy
        );

        let indexed: Vec<IndexedPolygon> = items
            .iter()
            .enumerate()
            .filter_map(|(order, item)| {
                let geometry = item.geometry();
                let Some(rect) = geometry.bounding_rect() else {
                    debug!(
                        "Skipping polygon '{}' with empty geometry",
                        item.label().unwrap_or_default()
                    );
                    return None;
                };
                Some(IndexedPolygon {
                    order,
                    area: geometry.unsigned_area(),
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();

        let tree = RTree::bulk_load(indexed);
        info!("Spatial index built with {} entries", tree.size());

        Self {
            tree,
            items,
            policy,
        }
    }

    /// The single containing polygon chosen by the containment policy
    pub fn lookup(&self, point: Point<f64>) -> Option<&T> {
        let candidates = self.candidates(point);

        let chosen = match self.policy {
            ContainmentPolicy::FirstInInputOrder => candidates.min_by_key(|ip| ip.order),
            ContainmentPolicy::SmallestArea => candidates
                .min_by(|a, b| a.area.total_cmp(&b.area).then(a.order.cmp(&b.order))),
            ContainmentPolicy::LexicalName => candidates.min_by(|a, b| {
                let (a_label, b_label) =
                    (self.items[a.order].label(), self.items[b.order].label());
                // Unlabelled polygons sort after every labelled one
                a_label
                    .is_none()
                    .cmp(&b_label.is_none())
                    .then(a_label.cmp(&b_label))
                    .then(a.order.cmp(&b.order))
            }),
        };

        chosen.map(|ip| &self.items[ip.order])
    }

    // Envelope candidates from the R-tree, filtered with exact containment
    fn candidates(&self, point: Point<f64>) -> impl Iterator<Item = &IndexedPolygon> + '_ {
        let query_envelope = AABB::from_point([point.x(), point.y()]);
        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(move |ip| self.items[ip.order].geometry().contains(&point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Region;
    use geo::{polygon, MultiPolygon};

    fn square(name: &str, min: f64, max: f64) -> Region {
        Region {
            name: Some(name.to_string()),
            geometry: MultiPolygon::new(vec![polygon![
                (x: min, y: min),
                (x: max, y: min),
                (x: max, y: max),
                (x: min, y: max),
                (x: min, y: min),
            ]]),
        }
    }

    fn overlapping() -> Vec<Region> {
        vec![
            square("Wessex", 0.0, 100.0),
            square("Anglia", 40.0, 60.0),
            square("Eastern", 0.0, 1000.0),
        ]
    }

    #[test]
    fn test_first_in_input_order() {
        let index = PolygonIndex::build(overlapping(), ContainmentPolicy::FirstInInputOrder);
        let hit = index.lookup(Point::new(50.0, 50.0)).unwrap();
        assert_eq!(hit.name.as_deref().unwrap(), "Wessex");

        let hit = index.lookup(Point::new(500.0, 500.0)).unwrap();
        assert_eq!(hit.name.as_deref().unwrap(), "Eastern");
    }

    #[test]
    fn test_smallest_area() {
        let index = PolygonIndex::build(overlapping(), ContainmentPolicy::SmallestArea);
        let hit = index.lookup(Point::new(50.0, 50.0)).unwrap();
        assert_eq!(hit.name.as_deref().unwrap(), "Anglia");
    }

    #[test]
    fn test_lexical_name() {
        let index = PolygonIndex::build(overlapping(), ContainmentPolicy::LexicalName);
        let hit = index.lookup(Point::new(50.0, 50.0)).unwrap();
        assert_eq!(hit.name.as_deref().unwrap(), "Anglia");

        let hit = index.lookup(Point::new(10.0, 10.0)).unwrap();
        assert_eq!(hit.name.as_deref().unwrap(), "Eastern");
    }

    #[test]
    fn test_lexical_name_puts_unnamed_last() {
        let mut unnamed = square("", 0.0, 100.0);
        unnamed.name = None;
        let index = PolygonIndex::build(
            vec![unnamed, square("Wessex", 0.0, 100.0)],
            ContainmentPolicy::LexicalName,
        );
        let hit = index.lookup(Point::new(50.0, 50.0)).unwrap();
        assert_eq!(hit.name.as_deref(), Some("Wessex"));
    }

    #[test]
    fn test_outside_and_boundary_do_not_match() {
        let index = PolygonIndex::build(vec![square("Wessex", 0.0, 100.0)], Default::default());
        assert!(index.lookup(Point::new(150.0, 50.0)).is_none());
        // Strictly within: a point on the edge is not contained
        assert!(index.lookup(Point::new(100.0, 50.0)).is_none());
    }

    #[test]
    fn test_empty_index() {
        let index: PolygonIndex<Region> = PolygonIndex::build(vec![], Default::default());
        assert!(index.lookup(Point::new(0.0, 0.0)).is_none());
    }
}
