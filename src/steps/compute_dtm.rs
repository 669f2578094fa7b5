use crate::geometry::PointCloud;
use crate::parameters::{InterpolationMethod, RunParameters};
use crate::raster::{mask_unsupported, ElevationGrid, Tin};
use crate::{Error, Result};

use log::info;

/// Interpolates the samples onto a regular grid covering their extent.
/// Cells outside the triangulated hull are left without elevation.
pub fn compute_dtm(cloud: &PointCloud, params: &RunParameters) -> Result<ElevationGrid> {
    let interpolation = &params.interpolation;

    let bounds = cloud.bounds().ok_or(Error::InsufficientData { found: 0 })?;
    let mut grid = ElevationGrid::covering(&bounds, params.resolution, cloud.crs)?;

    let tin = Tin::new(cloud)?;
    info!(
        "Gridding {} samples onto {}x{} cells of {} m using {} interpolation",
        cloud.len(),
        grid.width,
        grid.height,
        params.resolution,
        interpolation.method
    );

    match interpolation.method {
        InterpolationMethod::Linear => {
            tin.rasterize_linear(&mut grid, interpolation.max_triangle_edge_length)
        }
        InterpolationMethod::NaturalNeighbor => {
            tin.rasterize_natural_neighbor(&mut grid, interpolation.max_triangle_edge_length)
        }
    }

    if let Some(distance) = interpolation.support_distance {
        let cleared = mask_unsupported(&mut grid, cloud, distance);
        info!("Cleared {cleared} cells farther than {distance} m from any sample");
    }

    grid.count_samples(&cloud.points);

    if let Some((lo, hi)) = grid.z_range() {
        info!(
            "{} of {} cells have elevation, from {lo:.2} to {hi:.2}",
            grid.num_supported(),
            grid.field.len()
        );
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;
    use crate::geometry::PointSample;

    fn cloud(xyz: &[(f64, f64, f64)]) -> PointCloud {
        PointCloud::new(
            xyz.iter().map(|&(x, y, z)| PointSample::new(x, y, z)).collect(),
            Crs { epsg: 2180 },
        )
    }

    #[test]
    fn test_deterministic() {
        let pc = cloud(&[
            (0., 0., 1.),
            (3., 0.2, 2.),
            (5., 5., 4.),
            (0.5, 4., 3.),
            (2., 2., 7.),
        ]);
        let params = RunParameters {
            resolution: 0.25,
            ..Default::default()
        };

        let a = compute_dtm(&pc, &params).unwrap();
        let b = compute_dtm(&pc, &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.sample_count.iter().sum::<u32>(), 5);
    }

    #[test]
    fn test_invalid_input() {
        let params = RunParameters::default();

        assert!(matches!(
            compute_dtm(&cloud(&[(0., 0., 1.), (1., 0., 1.)]), &params),
            Err(Error::InsufficientData { found: 2 })
        ));
        assert!(matches!(
            compute_dtm(&cloud(&[(0., 0., 1.), (1., 1., 1.), (2., 2., 1.)]), &params),
            Err(Error::DegenerateGeometry)
        ));

        let params = RunParameters {
            resolution: -1.,
            ..Default::default()
        };
        assert!(matches!(
            compute_dtm(&cloud(&[(0., 0., 1.), (1., 0., 1.), (0., 1., 1.)]), &params),
            Err(Error::InvalidResolution(_))
        ));
    }
}
