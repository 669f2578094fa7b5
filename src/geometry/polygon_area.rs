use crate::crs::Crs;

use geo::{Area, BoundingRect, MultiPolygon, Rect};
use serde_json::{Map, Value};

/// A named footprint, e.g. a single heap, with the attributes it was read with
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonArea {
    pub id: String,
    pub geometry: MultiPolygon,
    pub attributes: Map<String, Value>,
}

impl PolygonArea {
    pub fn new(id: impl Into<String>, geometry: MultiPolygon) -> Self {
        Self {
            id: id.into(),
            geometry,
            attributes: Map::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Map<String, Value>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Nominal planar area of the footprint, holes excluded
    pub fn area(&self) -> f64 {
        self.geometry.unsigned_area()
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        self.geometry.bounding_rect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolygonLayer {
    pub crs: Crs,
    pub areas: Vec<PolygonArea>,
}

impl PolygonLayer {
    pub fn new(crs: Crs, areas: Vec<PolygonArea>) -> Self {
        Self { crs, areas }
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}
