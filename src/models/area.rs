//! Polygon datasets used for containment lookups.

use geo::MultiPolygon;

/// A network region polygon. An unnamed polygon still claims its points.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// An administrative area polygon with its country
#[derive(Debug, Clone)]
pub struct AdminArea {
    pub country: Option<String>,
    pub admin_area: Option<String>,
    pub geometry: MultiPolygon<f64>,
}

/// Anything that can be indexed for point-in-polygon lookup.
///
/// The label is only used by the lexical containment policy.
pub trait Polygonal {
    fn geometry(&self) -> &MultiPolygon<f64>;

    fn label(&self) -> Option<&str>;
}

impl Polygonal for Region {
    fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    fn label(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Polygonal for AdminArea {
    fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    fn label(&self) -> Option<&str> {
        self.admin_area.as_deref()
    }
}
