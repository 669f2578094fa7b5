use crate::{
    geometry::PolygonLayer,
    parameters::RunParameters,
    raster::ElevationGrid,
    steps::{self, HeapReport, OutputPaths, ZoneFlag},
    Error, Result,
};

use log::{info, warn};

use std::{
    path::PathBuf,
    sync::mpsc,
    thread,
    time::Instant,
};

/// Input files of a run
#[derive(Clone, Debug)]
pub struct InputPaths {
    pub polygons: PathBuf,
    pub point_cloud: PathBuf,
}

/// Runs the whole pipeline: read both inputs, move the polygons into the crs of the lidar,
/// grid the terrain, measure every polygon and write all outputs.
pub fn make_report(
    inputs: &InputPaths,
    outputs: &OutputPaths,
    params: &RunParameters,
) -> Result<Vec<HeapReport>> {
    let start = Instant::now();

    // both inputs are checked before any work is done
    for path in [&inputs.polygons, &inputs.point_cloud] {
        if !path.is_file() {
            return Err(Error::InputNotFound { path: path.clone() });
        }
    }

    // step 1: read the inputs
    let cloud = steps::read_laz(&inputs.point_cloud, params)?;
    let layer = steps::read_polygons(&inputs.polygons, params)?;

    // step 2: express the polygons in the crs of the lidar
    let layer = steps::reconcile_crs(&layer, cloud.crs)?;

    // step 3: the terrain model
    let grid = steps::compute_dtm(&cloud, params)?;
    drop(cloud);

    // step 4: measure
    let reports = measure_heaps(&layer, &grid, params)?;

    // step 5: write everything or nothing
    steps::write_outputs(outputs, layer.crs, &grid, &reports, params)?;

    info!(
        "Measured {} polygons in {:.1?}",
        reports.len(),
        start.elapsed()
    );
    Ok(reports)
}

/// Extracts and measures every polygon of the layer, the polygons are strided over
/// `params.threads` workers. The reports keep the order of the layer.
pub fn measure_heaps(
    layer: &PolygonLayer,
    grid: &ElevationGrid,
    params: &RunParameters,
) -> Result<Vec<HeapReport>> {
    grid.check_crs(layer.crs)?;

    let num_threads = params.threads.clamp(1, layer.len().max(1));
    info!(
        "Measuring {} polygons on {num_threads} threads using {} as base",
        layer.len(),
        params.base_policy
    );

    let (sender, receiver) = mpsc::channel();
    thread::scope(|s| {
        for thread_i in 0..num_threads {
            let sender = sender.clone();

            s.spawn(move || {
                let mut i = thread_i;
                while i < layer.areas.len() {
                    let area = &layer.areas[i];
                    let zone = steps::rasterize_zone(area, grid);
                    let metrics = steps::compute_metrics(&zone, area, grid, params);

                    // the receiver outlives the scope
                    let _ = sender.send((i, metrics));
                    i += num_threads;
                }
            });
        }
    });
    drop(sender);

    let mut measured: Vec<_> = receiver.into_iter().collect();
    measured.sort_by_key(|(i, _)| *i);

    let reports: Vec<HeapReport> = measured
        .into_iter()
        .map(|(i, metrics)| HeapReport {
            area: layer.areas[i].clone(),
            metrics,
        })
        .collect();

    for report in reports.iter() {
        match report.metrics.flag {
            ZoneFlag::Ok => (),
            ZoneFlag::EmptyZone => warn!(
                "Polygon {} covers no grid cell, reported with zero volume",
                report.area.id
            ),
            ZoneFlag::NoData => warn!(
                "Polygon {} has no terrain data under it, reported with zero volume",
                report.area.id
            ),
        }
    }

    Ok(reports)
}
