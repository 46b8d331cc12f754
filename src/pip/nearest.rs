//! Nearest-neighbour index over point features.

use geo::Point;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::info;

use crate::models::Place;

/// Anything with a point location
pub trait Located {
    fn location(&self) -> Point<f64>;
}

impl Located for Place {
    fn location(&self) -> Point<f64> {
        self.location
    }
}

/// Nearest item and its planar distance
#[derive(Debug, Clone, Copy)]
pub struct Nearest<'a, T> {
    pub item: &'a T,
    /// Euclidean distance in CRS units (metres)
    pub distance: f64,
}

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// R-tree over point items for planar nearest-neighbour queries
pub struct NearestIndex<T> {
    tree: RTree<IndexedPoint>,
    items: Vec<T>,
}

impl<T: Located> NearestIndex<T> {
    pub fn build(items: Vec<T>) -> Self {
        info!("Building nearest-neighbour index for {} points...", items.len());

        let points: Vec<IndexedPoint> = items
            .iter()
            .enumerate()
            .map(|(order, item)| {
                let p = item.location();
                GeomWithData::new([p.x(), p.y()], order)
            })
            .collect();

        Self {
            tree: RTree::bulk_load(points),
            items,
        }
    }

    /// Closest item to the point.
    ///
    /// Items at exactly the same minimum distance resolve to the one earliest in
    /// loader order.
    pub fn nearest(&self, point: Point<f64>) -> Option<Nearest<'_, T>> {
        let mut neighbours = self
            .tree
            .nearest_neighbor_iter_with_distance_2(&[point.x(), point.y()]);

        let (first, best_distance_2) = neighbours.next()?;
        let mut best = first.data;
        for (candidate, distance_2) in neighbours {
            if distance_2 > best_distance_2 {
                break;
            }
            best = best.min(candidate.data);
        }

        Some(Nearest {
            item: &self.items[best],
            distance: best_distance_2.sqrt(),
        })
    }
}
