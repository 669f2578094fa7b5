use crate::crs::Crs;
use crate::{Error, Result};

use geo::{Coord, Rect};
use std::ops::Index;

/// One lidar return, immutable once read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl PointSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn coords(&self) -> Coord {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    pub fn squared_euclidean_distance(&self, b: &PointSample) -> f64 {
        (self.x - b.x).powi(2) + (self.y - b.y).powi(2)
    }

    // twice the signed area of the triangle self-a-b, positive for a left turn
    pub fn consecutive_orientation(&self, a: &PointSample, b: &PointSample) -> f64 {
        (a.x - self.x) * (b.y - self.y) - (a.y - self.y) * (b.x - self.x)
    }
}

#[derive(Clone, Debug)]
pub struct PointCloud {
    pub points: Vec<PointSample>,
    pub crs: Crs,
}

impl PointCloud {
    pub fn new(points: Vec<PointSample>, crs: Crs) -> Self {
        Self { points, crs }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn add(&mut self, v: Vec<PointSample>) {
        self.points.extend(v);
    }

    pub fn to_2d_slice(&self) -> Vec<[f64; 2]> {
        self.points.iter().map(|p| [p.x, p.y]).collect()
    }

    /// The 2D bounding box of all samples, `None` for an empty cloud
    pub fn bounds(&self) -> Option<Rect> {
        let first = self.points.first()?;

        let mut min = first.coords();
        let mut max = first.coords();
        for p in self.points.iter().skip(1) {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Rect::new(min, max))
    }

    pub fn z_range(&self) -> Option<(f64, f64)> {
        self.points.iter().fold(None, |acc, p| match acc {
            None => Some((p.z, p.z)),
            Some((lo, hi)) => Some((lo.min(p.z), hi.max(p.z))),
        })
    }

    /// Checks that the samples span an area, i.e. that a triangulation of them exists
    pub fn check_interpolatable(&self) -> Result<()> {
        if self.points.len() < 3 {
            return Err(Error::InsufficientData {
                found: self.points.len(),
            });
        }

        let origin = self.points[0];

        // the point farthest from the first one spans the reference direction
        let mut far = origin;
        let mut far_dist = 0.;
        for p in self.points.iter() {
            let d = origin.squared_euclidean_distance(p);
            if d > far_dist {
                far_dist = d;
                far = *p;
            }
        }

        if far_dist <= f64::EPSILON {
            return Err(Error::DegenerateGeometry);
        }

        // orientation is twice the triangle area, divide by the base for the distance off the line
        let base = far_dist.sqrt();
        let tolerance = 1e-9 * base.max(1.);
        let spans_area = self
            .points
            .iter()
            .any(|p| (origin.consecutive_orientation(&far, p) / base).abs() > tolerance);

        if spans_area {
            Ok(())
        } else {
            Err(Error::DegenerateGeometry)
        }
    }
}

impl Index<usize> for PointCloud {
    type Output = PointSample;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::WGS84;

    fn cloud(xyz: &[(f64, f64, f64)]) -> PointCloud {
        PointCloud::new(
            xyz.iter().map(|&(x, y, z)| PointSample::new(x, y, z)).collect(),
            WGS84,
        )
    }

    #[test]
    fn test_bounds() {
        let pc = cloud(&[(1., 5., 0.), (-2., 3., 1.), (4., -1., 7.)]);
        let bounds = pc.bounds().unwrap();

        assert_eq!(bounds.min(), Coord { x: -2., y: -1. });
        assert_eq!(bounds.max(), Coord { x: 4., y: 5. });
        assert_eq!(pc.z_range(), Some((0., 7.)));
        assert!(cloud(&[]).bounds().is_none());
    }

    #[test]
    fn test_too_few_points() {
        let pc = cloud(&[(0., 0., 0.), (1., 1., 1.)]);
        assert!(matches!(
            pc.check_interpolatable(),
            Err(Error::InsufficientData { found: 2 })
        ));
    }

    #[test]
    fn test_collinear_points() {
        let pc = cloud(&[(0., 0., 0.), (1., 1., 1.), (2., 2., 5.), (10., 10., 3.)]);
        assert!(matches!(
            pc.check_interpolatable(),
            Err(Error::DegenerateGeometry)
        ));

        let pc = cloud(&[(3., 3., 0.), (3., 3., 1.), (3., 3., 2.)]);
        assert!(matches!(
            pc.check_interpolatable(),
            Err(Error::DegenerateGeometry)
        ));

        let pc = cloud(&[(0., 0., 0.), (10., 0., 1.), (5., 0.1, 2.)]);
        assert!(pc.check_interpolatable().is_ok());
    }
}
