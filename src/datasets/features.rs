//! Reading converted spatial stores.
//!
//! The conversion step leaves each source as a GeoJSON feature collection with its
//! source (upper-case, shapefile) attribute names and flattened 2D geometry.

use anyhow::{Context, Result};
use geo::{MultiLineString, MultiPolygon, Point};
use geo_types::Geometry;
use geojson::{FeatureCollection, JsonObject, JsonValue};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A feature from a spatial store: attributes plus 2D geometry
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub properties: JsonObject,
    pub geometry: Option<Geometry<f64>>,
}

impl RawFeature {
    /// Attribute lookup, exact key first, then ignoring ASCII case
    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key).or_else(|| {
            self.properties
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
    }

    /// Text attribute, exactly as stored. Numbers are rendered as text.
    pub fn string(&self, key: &str) -> Option<String> {
        match self.property(key)? {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Numeric attribute; numeric text is parsed
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.property(key)? {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn multi_polygon(&self) -> Option<MultiPolygon<f64>> {
        match self.geometry.as_ref()? {
            Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
            Geometry::MultiPolygon(mp) => Some(mp.clone()),
            _ => None,
        }
    }

    pub fn point(&self) -> Option<Point<f64>> {
        match self.geometry.as_ref()? {
            Geometry::Point(p) => Some(*p),
            Geometry::MultiPoint(mp) if mp.0.len() == 1 => Some(mp.0[0]),
            _ => None,
        }
    }

    pub fn multi_line_string(&self) -> Option<MultiLineString<f64>> {
        match self.geometry.as_ref()? {
            Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
            Geometry::MultiLineString(mls) => Some(mls.clone()),
            _ => None,
        }
    }
}

/// Read every feature of a GeoJSON feature collection
pub fn read_features(path: &Path) -> Result<Vec<RawFeature>> {
    info!("Reading spatial store {}", path.display());

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read spatial store {}", path.display()))?;
    parse_features(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse_features(text: &str) -> Result<Vec<RawFeature>> {
    let collection: FeatureCollection = text.parse()?;

    let mut features = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let geometry = match feature.geometry {
            Some(g) => match Geometry::<f64>::try_from(g.value) {
                Ok(geometry) => Some(geometry),
                Err(e) => {
                    debug!("Unsupported feature geometry: {}", e);
                    None
                }
            },
            None => None,
        };
        features.push(RawFeature {
            properties: feature.properties.unwrap_or_default(),
            geometry,
        });
    }

    Ok(features)
}
