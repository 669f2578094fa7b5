use crate::crs::Crs;
use crate::parameters::RunParameters;
use crate::raster::{write_geotiff, write_world_file, ElevationGrid};
use crate::steps::{HeapReport, ZoneFlag};
use crate::{Error, Result};

use geo::{LineString, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, PolygonType, Value};
use log::info;
use serde::Serialize;
use serde_json::json;
use tempfile::NamedTempFile;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Where the results of a run are written
#[derive(Clone, Debug)]
pub struct OutputPaths {
    pub polygons: PathBuf,
    pub raster: PathBuf,
    pub table: PathBuf,
    /// Polygons with only the identifier and the metric properties
    pub results: Option<PathBuf>,
}

type StagedWriter<'a> = BufWriter<&'a mut File>;

/// Output files written next to their destination and moved into place together
#[derive(Default)]
struct Staging {
    files: Vec<(NamedTempFile, PathBuf)>,
}

impl Staging {
    fn stage<F>(&mut self, path: &Path, write: F) -> Result<()>
    where
        F: FnOnce(&mut StagedWriter) -> Result<()>,
    {
        let write_failure = |source: Error| Error::WriteFailure {
            path: path.to_path_buf(),
            source: Box::new(source),
        };

        let directory = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp = tempfile::Builder::new()
            .prefix(".heap_volume")
            .tempfile_in(directory)
            .map_err(|e| write_failure(e.into()))?;

        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write(&mut writer).map_err(write_failure)?;
            writer.flush().map_err(|e| write_failure(e.into()))?;
        }

        self.files.push((temp, path.to_path_buf()));
        Ok(())
    }

    fn commit(self) -> Result<()> {
        for (temp, path) in self.files {
            temp.persist(&path)
                .map_err(|e| Error::WriteFailure {
                    path,
                    source: Box::new(e.error.into()),
                })?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct TableRow<'a> {
    id: &'a str,
    volume_m3: f64,
    surface_m2: f64,
    coverage: f64,
    base_elevation: Option<f64>,
    surface_3d_m2: f64,
    cells: usize,
    supported_cells: usize,
    flag: ZoneFlag,
}

impl<'a> From<&'a HeapReport> for TableRow<'a> {
    fn from(report: &'a HeapReport) -> Self {
        let m = &report.metrics;
        TableRow {
            id: &report.area.id,
            volume_m3: m.volume,
            surface_m2: m.surface_area,
            coverage: m.coverage_ratio,
            base_elevation: m.base_elevation,
            surface_3d_m2: m.surface_area_3d,
            cells: m.cells,
            supported_cells: m.supported_cells,
            flag: m.flag,
        }
    }
}

/// Writes the elevation grid, the table and the polygon files.
/// Either every file is written or none of them are touched.
pub fn write_outputs(
    paths: &OutputPaths,
    crs: Crs,
    grid: &ElevationGrid,
    reports: &[HeapReport],
    params: &RunParameters,
) -> Result<()> {
    let mut staging = Staging::default();

    staging.stage(&paths.raster, |w| write_geotiff(grid, w))?;
    staging.stage(&paths.raster.with_extension("tfw"), |w| {
        write_world_file(grid, w)
    })?;
    if let Some(wkt) = grid.crs.wkt() {
        staging.stage(&paths.raster.with_extension("prj"), |w| {
            Ok(w.write_all(wkt.as_bytes())?)
        })?;
    }
    staging.stage(&paths.table, |w| write_table(reports, w))?;
    staging.stage(&paths.polygons, |w| {
        write_polygons(reports, crs, None, w)
    })?;
    if let Some(results) = &paths.results {
        staging.stage(results, |w| {
            write_polygons(reports, crs, Some(&params.id_field), w)
        })?;
    }

    staging.commit()?;

    info!(
        "Wrote {}, {} and {}",
        paths.raster.display(),
        paths.table.display(),
        paths.polygons.display()
    );
    Ok(())
}

pub fn write_table<W: Write>(reports: &[HeapReport], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for report in reports {
        csv.serialize(TableRow::from(report))?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the polygons with the metrics appended to their attributes.
/// With `results_only` set the attributes are replaced by that identifier field.
pub fn write_polygons<W: Write>(
    reports: &[HeapReport],
    crs: Crs,
    results_only: Option<&str>,
    writer: W,
) -> Result<()> {
    let features = reports
        .iter()
        .map(|report| {
            let mut properties = match results_only {
                Some(id_field) => {
                    let mut properties = JsonObject::new();
                    properties.insert(id_field.to_string(), json!(report.area.id));
                    properties
                }
                None => report.area.attributes.clone(),
            };
            append_metrics(&mut properties, report);

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geometry_value(report))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "crs".to_string(),
        json!({ "type": "name", "properties": { "name": crs.urn() } }),
    );

    let collection = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    });

    serde_json::to_writer(writer, &collection)?;
    Ok(())
}

fn append_metrics(properties: &mut JsonObject, report: &HeapReport) {
    let m = &report.metrics;
    properties.insert("volume_m3".to_string(), json!(m.volume));
    properties.insert("surface_m2".to_string(), json!(m.surface_area));
    properties.insert("surface_3d_m2".to_string(), json!(m.surface_area_3d));
    properties.insert("coverage".to_string(), json!(m.coverage_ratio));
    properties.insert("base_elevation".to_string(), json!(m.base_elevation));
    properties.insert("flag".to_string(), json!(m.flag));
}

fn ring_positions(ring: &LineString) -> Vec<Vec<f64>> {
    ring.coords().map(|c| vec![c.x, c.y]).collect()
}

fn polygon_rings(polygon: &Polygon) -> PolygonType {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_positions)
        .collect()
}

fn geometry_value(report: &HeapReport) -> Value {
    match &report.area.geometry.0[..] {
        [polygon] => Value::Polygon(polygon_rings(polygon)),
        polygons => Value::MultiPolygon(polygons.iter().map(polygon_rings).collect()),
    }
}
