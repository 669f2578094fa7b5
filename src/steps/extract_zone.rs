use crate::crs::Crs;
use crate::geometry::{PolygonArea, Rings};
use crate::raster::ElevationGrid;
use crate::Result;

use geo::BoundingRect;

use std::collections::BTreeMap;

// overlaps smaller than this share of a cell are rounding noise along the polygon edge
const MIN_WEIGHT: f64 = 1e-12;

/// A grid cell that overlaps a polygon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneCell {
    pub row: usize,
    pub col: usize,
    /// Share of the cell area inside the polygon, in (0, 1]
    pub weight: f64,
    pub elevation: Option<f64>,
    pub sample_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneExtraction {
    pub cells: Vec<ZoneCell>,
    pub cell_area: f64,
    /// Planar area of the polygon itself
    pub polygon_area: f64,
}

impl ZoneExtraction {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The covered area, equal to the polygon area where the polygon lies within the grid
    pub fn weighted_area(&self) -> f64 {
        self.cells.iter().map(|c| c.weight).sum::<f64>() * self.cell_area
    }

    pub fn supported(&self) -> impl Iterator<Item = (&ZoneCell, f64)> {
        self.cells
            .iter()
            .filter_map(|c| c.elevation.map(|z| (c, z)))
    }
}

/// The cells of `grid` overlapping `area`, with the exact overlapping share of each cell
pub fn extract_zone(area: &PolygonArea, crs: Crs, grid: &ElevationGrid) -> Result<ZoneExtraction> {
    grid.check_crs(crs)?;
    Ok(rasterize_zone(area, grid))
}

/// [extract_zone] for an area already known to be in the crs of the grid
pub fn rasterize_zone(area: &PolygonArea, grid: &ElevationGrid) -> ZoneExtraction {
    let t = grid.transform;
    let cs = t.cell_size;

    // multipolygon parts are summed, they may share cells
    let mut weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();

    for polygon in area.geometry.iter() {
        let rings = Rings::from_polygon(polygon);
        if rings.is_empty() || rings.area() <= 0. {
            continue;
        }
        let Some(bbox) = polygon.bounding_rect() else {
            continue;
        };

        let row_start = ((t.tl_coord.y - bbox.max().y) / cs).floor().max(0.);
        let row_end = ((t.tl_coord.y - bbox.min().y) / cs)
            .floor()
            .min(grid.height as f64 - 1.);
        if row_end < row_start {
            continue;
        }

        for yi in row_start as usize..=row_end as usize {
            let cell_tl = t.index2coord(yi, 0);
            let band = rings.clip_y(cell_tl.y - cs, cell_tl.y);
            if band.is_empty() {
                continue;
            }

            let (band_min_x, band_max_x) = band
                .exterior
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                    (lo.min(c.x), hi.max(c.x))
                });

            let col_start = ((band_min_x - t.tl_coord.x) / cs).floor().max(0.);
            let col_end = ((band_max_x - t.tl_coord.x) / cs)
                .floor()
                .min(grid.width as f64 - 1.);
            if col_end < col_start {
                continue;
            }

            for xi in col_start as usize..=col_end as usize {
                let x0 = t.tl_coord.x + xi as f64 * cs;
                let overlap = band.clip_x(x0, x0 + cs).area();
                if overlap > 0. {
                    *weights.entry((yi, xi)).or_default() += overlap / t.cell_area();
                }
            }
        }
    }

    let cells = weights
        .into_iter()
        .filter(|&(_, w)| w > MIN_WEIGHT)
        .map(|((row, col), w)| ZoneCell {
            row,
            col,
            weight: w.min(1.),
            elevation: grid.elevation(row, col),
            sample_count: grid.samples(row, col),
        })
        .collect();

    ZoneExtraction {
        cells,
        cell_area: t.cell_area(),
        polygon_area: area.area(),
    }
}
