use crate::geometry::PolygonArea;
use crate::parameters::{BasePolicy, RunParameters};
use crate::raster::ElevationGrid;
use crate::steps::ZoneExtraction;

use serde::Serialize;

use std::fmt::Display;

/// Quality of the measurement of one polygon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneFlag {
    Ok,
    /// The polygon covers no grid cell, it is outside the grid or has no area
    EmptyZone,
    /// The polygon covers cells, but none of them have elevation
    NoData,
}

impl Display for ZoneFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneFlag::Ok => f.write_str("ok"),
            ZoneFlag::EmptyZone => f.write_str("empty_zone"),
            ZoneFlag::NoData => f.write_str("no_data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonMetrics {
    /// Volume above the base, in cubic crs units
    pub volume: f64,
    /// Planar area of the supported part of the polygon
    pub surface_area: f64,
    /// Draped area of the terrain inside the polygon
    pub surface_area_3d: f64,
    /// Share of the covered cells holding at least one sample and an elevation
    pub coverage_ratio: f64,
    pub base_elevation: Option<f64>,
    pub cells: usize,
    pub supported_cells: usize,
    pub flag: ZoneFlag,
}

/// A polygon together with its measurement
#[derive(Debug, Clone, PartialEq)]
pub struct HeapReport {
    pub area: PolygonArea,
    pub metrics: PolygonMetrics,
}

/// Volume, areas and coverage of one zone.
///
/// A zone without cells or without elevation yields zero volume and area and a flag saying why,
/// it never fails the run.
pub fn compute_metrics(
    zone: &ZoneExtraction,
    area: &PolygonArea,
    grid: &ElevationGrid,
    params: &RunParameters,
) -> PolygonMetrics {
    let supported_cells = zone.supported().count();

    let flag = if zone.is_empty() {
        ZoneFlag::EmptyZone
    } else if supported_cells == 0 {
        ZoneFlag::NoData
    } else {
        ZoneFlag::Ok
    };

    let base_elevation = base_elevation(zone, area, grid, params.base_policy);

    let mut volume = 0.;
    let mut surface_area = 0.;
    let mut surface_area_3d = 0.;
    if let Some(base) = base_elevation {
        for (cell, z) in zone.supported() {
            let footprint = zone.cell_area * cell.weight;

            let height = z - base;
            let height = if params.allow_cut { height } else { height.max(0.) };
            volume += height * footprint;

            surface_area += footprint;

            let (dzdx, dzdy) = grid.gradient(cell.row, cell.col).unwrap_or((0., 0.));
            surface_area_3d += footprint * (1. + dzdx * dzdx + dzdy * dzdy).sqrt();
        }
    }

    let coverage_ratio = if zone.is_empty() {
        0.
    } else {
        let covered = zone
            .cells
            .iter()
            .filter(|c| c.sample_count > 0 && c.elevation.is_some())
            .count();
        covered as f64 / zone.cells.len() as f64
    };

    PolygonMetrics {
        volume,
        surface_area,
        surface_area_3d,
        coverage_ratio,
        base_elevation,
        cells: zone.cells.len(),
        supported_cells,
        flag,
    }
}

fn zone_minimum(zone: &ZoneExtraction) -> Option<f64> {
    zone.supported().map(|(_, z)| z).reduce(f64::min)
}

/// Mean terrain elevation along the exterior rings, sampled about once per cell
fn boundary_ring_mean(area: &PolygonArea, grid: &ElevationGrid) -> Option<f64> {
    let step = grid.transform.cell_size;

    let mut sum = 0.;
    let mut count = 0;
    for polygon in area.geometry.iter() {
        for line in polygon.exterior().lines() {
            let length = (line.dx().powi(2) + line.dy().powi(2)).sqrt();
            let num_steps = (length / step).ceil().max(1.) as usize;

            // the end point is the start of the next segment
            for i in 0..num_steps {
                let t = i as f64 / num_steps as f64;
                let c = line.start + (line.end - line.start) * t;
                if let Some(z) = grid.sample(c) {
                    sum += z;
                    count += 1;
                }
            }
        }
    }

    (count > 0).then(|| sum / count as f64)
}

fn base_elevation(
    zone: &ZoneExtraction,
    area: &PolygonArea,
    grid: &ElevationGrid,
    policy: BasePolicy,
) -> Option<f64> {
    match policy {
        BasePolicy::Fixed(z) => Some(z),
        BasePolicy::ZoneMinimum => zone_minimum(zone),
        BasePolicy::BoundaryRing => {
            boundary_ring_mean(area, grid).or_else(|| zone_minimum(zone))
        }
    }
}
