use crate::crs::Crs;
use crate::geometry::{PolygonArea, PolygonLayer};
use crate::Result;

use geo::{Coord, LineString, MultiPolygon, Polygon};
use log::{debug, info};
use proj4rs::{transform::transform, Proj};

struct Reprojection {
    from: Proj,
    to: Proj,
    from_latlong: bool,
    to_latlong: bool,
}

impl Reprojection {
    fn new(from: Crs, to: Crs) -> Result<Reprojection> {
        let from = from.proj()?;
        let to = to.proj()?;
        Ok(Reprojection {
            from_latlong: from.is_latlong(),
            to_latlong: to.is_latlong(),
            from,
            to,
        })
    }

    fn line_string(&self, line: &LineString) -> Result<LineString> {
        // proj4rs works in radians for geographic systems
        let mut points: Vec<(f64, f64)> = line
            .0
            .iter()
            .map(|c| {
                if self.from_latlong {
                    (c.x.to_radians(), c.y.to_radians())
                } else {
                    (c.x, c.y)
                }
            })
            .collect();

        transform(&self.from, &self.to, points.as_mut_slice())?;

        Ok(points
            .into_iter()
            .map(|(x, y)| {
                if self.to_latlong {
                    Coord {
                        x: x.to_degrees(),
                        y: y.to_degrees(),
                    }
                } else {
                    Coord { x, y }
                }
            })
            .collect())
    }

    fn polygon(&self, polygon: &Polygon) -> Result<Polygon> {
        let exterior = self.line_string(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .map(|r| self.line_string(r))
            .collect::<Result<Vec<LineString>>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    fn multi_polygon(&self, mp: &MultiPolygon) -> Result<MultiPolygon> {
        mp.iter()
            .map(|p| self.polygon(p))
            .collect::<Result<Vec<Polygon>>>()
            .map(MultiPolygon::new)
    }
}

/// Expresses the polygon layer in `target`, ids and attributes are kept.
/// A layer already in `target` is returned unchanged.
pub fn reconcile_crs(layer: &PolygonLayer, target: Crs) -> Result<PolygonLayer> {
    if layer.crs == target {
        debug!("Polygons are already in {target}");
        return Ok(layer.clone());
    }

    info!("Reprojecting {} polygons from {} to {target}", layer.len(), layer.crs);
    let reprojection = Reprojection::new(layer.crs, target)?;

    let areas = layer
        .areas
        .iter()
        .map(|area| {
            Ok(PolygonArea {
                geometry: reprojection.multi_polygon(&area.geometry)?,
                ..area.clone()
            })
        })
        .collect::<Result<Vec<PolygonArea>>>()?;

    Ok(PolygonLayer::new(target, areas))
}
