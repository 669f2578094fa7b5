use crate::crs::Crs;
use crate::geometry::PointSample;
use crate::{Error, Result};

use geo::{Coord, Rect};

use std::ops::Index;

/// North-up affine transform, cell (0, 0) is the top left cell
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridTransform {
    pub tl_coord: Coord,
    pub cell_size: f64,
}

impl GridTransform {
    /// Top left corner of the cell
    #[inline]
    pub fn index2coord(&self, yi: usize, xi: usize) -> Coord {
        Coord {
            x: (xi as f64) * self.cell_size + self.tl_coord.x,
            y: self.tl_coord.y - (yi as f64) * self.cell_size,
        }
    }

    #[inline]
    pub fn cell_center(&self, yi: usize, xi: usize) -> Coord {
        Coord {
            x: (xi as f64 + 0.5) * self.cell_size + self.tl_coord.x,
            y: self.tl_coord.y - (yi as f64 + 0.5) * self.cell_size,
        }
    }

    /// Fractional (row, column) position of a coordinate, may be outside the grid
    #[inline]
    pub fn coord2fractional(&self, c: Coord) -> (f64, f64) {
        (
            (self.tl_coord.y - c.y) / self.cell_size,
            (c.x - self.tl_coord.x) / self.cell_size,
        )
    }

    #[inline]
    pub fn cell_area(&self) -> f64 {
        self.cell_size * self.cell_size
    }
}

/// Digital terrain model with a sample count per cell
#[derive(Clone, Debug, PartialEq)]
pub struct ElevationGrid {
    pub width: usize,
    pub height: usize,
    pub transform: GridTransform,
    pub crs: Crs,
    pub field: Vec<Option<f64>>,
    pub sample_count: Vec<u32>,
}

impl ElevationGrid {
    pub fn new(width: usize, height: usize, transform: GridTransform, crs: Crs) -> ElevationGrid {
        ElevationGrid {
            width,
            height,
            transform,
            crs,
            field: vec![None; width * height],
            sample_count: vec![0; width * height],
        }
    }

    /// An empty grid covering `bounds`, with every edge pushed outwards to a multiple of the cell size
    pub fn covering(bounds: &Rect, cell_size: f64, crs: Crs) -> Result<ElevationGrid> {
        if !(cell_size.is_finite() && cell_size > 0.) {
            return Err(Error::InvalidResolution(cell_size));
        }

        // snapping can land a rounding error inside the bounds, step back out when it does
        let mut min_x = (bounds.min().x / cell_size).floor() * cell_size;
        if min_x > bounds.min().x {
            min_x -= cell_size;
        }
        let mut max_y = (bounds.max().y / cell_size).ceil() * cell_size;
        if max_y < bounds.max().y {
            max_y += cell_size;
        }

        // same expressions as `coord2fractional`, so the far bounds never fall outside
        let width = ((bounds.max().x - min_x) / cell_size).ceil().max(1.) as usize;
        let height = ((max_y - bounds.min().y) / cell_size).ceil().max(1.) as usize;
        if width.checked_mul(height).is_none() {
            return Err(Error::InvalidResolution(cell_size));
        }

        let transform = GridTransform {
            tl_coord: Coord { x: min_x, y: max_y },
            cell_size,
        };

        Ok(ElevationGrid::new(width, height, transform, crs))
    }

    pub fn check_crs(&self, crs: Crs) -> Result<()> {
        if self.crs != crs {
            return Err(Error::CrsMismatch {
                expected: self.crs,
                found: crs,
            });
        }
        Ok(())
    }

    pub fn extent(&self) -> Rect {
        let tl = self.transform.tl_coord;
        Rect::new(
            tl,
            Coord {
                x: tl.x + self.width as f64 * self.transform.cell_size,
                y: tl.y - self.height as f64 * self.transform.cell_size,
            },
        )
    }

    /// The (row, column) of the cell containing `c`.
    /// Cells are half open, except along the east and south edges of the grid
    pub fn cell_of(&self, c: Coord) -> Option<(usize, usize)> {
        let (yf, xf) = self.transform.coord2fractional(c);
        if !(yf >= 0. && xf >= 0.) {
            return None;
        }

        let yi = yf.floor() as usize;
        let xi = xf.floor() as usize;

        let yi = if yi == self.height && yf <= self.height as f64 {
            yi - 1
        } else {
            yi
        };
        let xi = if xi == self.width && xf <= self.width as f64 {
            xi - 1
        } else {
            xi
        };

        (yi < self.height && xi < self.width).then_some((yi, xi))
    }

    pub fn count_samples(&mut self, points: &[PointSample]) {
        for p in points {
            if let Some((yi, xi)) = self.cell_of(p.coords()) {
                self.sample_count[yi * self.width + xi] += 1;
            }
        }
    }

    #[inline]
    pub fn elevation(&self, yi: usize, xi: usize) -> Option<f64> {
        self.field[yi * self.width + xi]
    }

    #[inline]
    pub fn samples(&self, yi: usize, xi: usize) -> u32 {
        self.sample_count[yi * self.width + xi]
    }

    /// Elevation of the cell containing `c`
    pub fn sample(&self, c: Coord) -> Option<f64> {
        self.cell_of(c).and_then(|(yi, xi)| self.elevation(yi, xi))
    }

    pub fn num_supported(&self) -> usize {
        self.field.iter().filter(|z| z.is_some()).count()
    }

    pub fn z_range(&self) -> Option<(f64, f64)> {
        self.field.iter().flatten().fold(None, |acc, &z| match acc {
            None => Some((z, z)),
            Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
        })
    }

    /// Terrain gradient (dz/dx, dz/dy) at a supported cell from central differences,
    /// one sided where a neighbour has no data
    pub fn gradient(&self, yi: usize, xi: usize) -> Option<(f64, f64)> {
        let z = self.elevation(yi, xi)?;
        let cs = self.transform.cell_size;

        let left = xi.checked_sub(1).and_then(|x| self.elevation(yi, x));
        let right = (xi + 1 < self.width)
            .then(|| self.elevation(yi, xi + 1))
            .flatten();
        // rows increase southwards
        let up = yi.checked_sub(1).and_then(|y| self.elevation(y, xi));
        let down = (yi + 1 < self.height)
            .then(|| self.elevation(yi + 1, xi))
            .flatten();

        let difference = |low: Option<f64>, high: Option<f64>| match (low, high) {
            (Some(l), Some(h)) => (h - l) / (2. * cs),
            (Some(l), None) => (z - l) / cs,
            (None, Some(h)) => (h - z) / cs,
            (None, None) => 0.,
        };

        Some((difference(left, right), difference(down, up)))
    }
}

impl Index<(usize, usize)> for ElevationGrid {
    type Output = Option<f64>;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.field[index.0 * self.width + index.1]
    }
}
