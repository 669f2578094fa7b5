use crate::crs::{Crs, WGS84};
use crate::geometry::{PolygonArea, PolygonLayer};
use crate::parameters::RunParameters;
use crate::{Error, Result};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, JsonObject, PolygonType, Value};
use log::{info, warn};

use std::fs;
use std::path::Path;

pub fn read_polygons(path: &Path, params: &RunParameters) -> Result<PolygonLayer> {
    if !path.is_file() {
        return Err(Error::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let layer = parse_polygons(&fs::read_to_string(path)?, params)?;
    info!(
        "Read {} polygons in {} from {}",
        layer.len(),
        layer.crs,
        path.display()
    );
    Ok(layer)
}

/// Parses a GeoJSON document into polygon areas, in feature order.
/// Features without polygonal geometry are skipped with a warning.
pub fn parse_polygons(text: &str, params: &RunParameters) -> Result<PolygonLayer> {
    let collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(feature) => FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        },
        GeoJson::Geometry(geometry) => FeatureCollection {
            bbox: None,
            features: vec![Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            foreign_members: None,
        },
    };

    let crs = match params.polygon_crs {
        Some(crs) => crs,
        None => match declared_crs(collection.foreign_members.as_ref())? {
            Some(crs) => crs,
            None => {
                warn!("The polygon file declares no crs, assuming {WGS84}");
                WGS84
            }
        },
    };

    let mut areas = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let Some(geometry) = feature.geometry else {
            warn!("Skipping feature {i} without geometry");
            continue;
        };

        let polygons = match geometry.value {
            Value::Polygon(rings) => vec![to_polygon(&rings)?],
            Value::MultiPolygon(parts) => parts
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<Result<Vec<Polygon>>>()?,
            other => {
                warn!(
                    "Skipping feature {i} with {} geometry",
                    geometry_name(&other)
                );
                continue;
            }
        };

        let attributes = feature.properties.unwrap_or_default();
        let id = attributes
            .get(&params.id_field)
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .or_else(|| {
                feature.id.map(|id| match id {
                    Id::String(s) => s,
                    Id::Number(n) => n.to_string(),
                })
            })
            .unwrap_or_else(|| i.to_string());

        areas.push(PolygonArea::new(id, MultiPolygon::new(polygons)).with_attributes(attributes));
    }

    Ok(PolygonLayer::new(crs, areas))
}

/// The crs named by the legacy `crs` member, `None` if there is no such member
fn declared_crs(foreign_members: Option<&JsonObject>) -> Result<Option<Crs>> {
    let Some(member) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(None);
    };

    let name = member
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .ok_or_else(|| Error::CrsUndefined(format!("unsupported crs member {member}")))?;

    Crs::parse(name).map(Some)
}

fn to_line_string(ring: &[Vec<f64>]) -> Result<LineString> {
    ring.iter()
        .map(|position| match position[..] {
            [x, y, ..] => Ok(Coord { x, y }),
            _ => Err(Error::UnsupportedGeometry(format!(
                "position {position:?} has fewer than two coordinates"
            ))),
        })
        .collect::<Result<Vec<Coord>>>()
        .map(LineString::new)
}

fn to_polygon(rings: &PolygonType) -> Result<Polygon> {
    let mut rings = rings.iter();
    let exterior = match rings.next() {
        Some(ring) => to_line_string(ring)?,
        None => LineString::new(vec![]),
    };
    let interiors = rings
        .map(|r| to_line_string(r))
        .collect::<Result<Vec<LineString>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn geometry_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}
