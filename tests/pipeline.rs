use heap_volume::{
    crs::Crs,
    geometry::{PointCloud, PointSample, PolygonArea, PolygonLayer},
    make_report, measure_heaps,
    parameters::{BasePolicy, RunParameters},
    steps::{self, OutputPaths, ZoneFlag},
    Error, InputPaths,
};

use approx::assert_relative_eq;
use geo::{polygon, MultiPolygon, Polygon};
use las::{point::Classification, Builder, Point, Vlr, Writer};

use std::fs;
use std::path::Path;

const PUWG: Crs = Crs { epsg: 2180 };

fn corner_cloud() -> PointCloud {
    PointCloud::new(
        vec![
            PointSample::new(0., 0., 0.),
            PointSample::new(10., 0., 0.),
            PointSample::new(0., 10., 0.),
            PointSample::new(10., 10., 10.),
        ],
        PUWG,
    )
}

fn layer(polygons: Vec<(&str, Polygon)>) -> PolygonLayer {
    PolygonLayer::new(
        PUWG,
        polygons
            .into_iter()
            .map(|(id, p)| PolygonArea::new(id, MultiPolygon::new(vec![p])))
            .collect(),
    )
}

fn unit_params() -> RunParameters {
    RunParameters {
        resolution: 1.,
        base_policy: BasePolicy::Fixed(0.),
        threads: 3,
        ..Default::default()
    }
}

fn output_paths(dir: &Path) -> OutputPaths {
    OutputPaths {
        polygons: dir.join("heaps.geojson"),
        raster: dir.join("dtm.tif"),
        table: dir.join("heaps.csv"),
        results: Some(dir.join("results.geojson")),
    }
}

#[test]
fn corner_ramp_scenario() {
    let params = unit_params();
    let grid = steps::compute_dtm(&corner_cloud(), &params).unwrap();

    let square = polygon![(x: 0., y: 0.), (x: 10., y: 0.), (x: 10., y: 10.), (x: 0., y: 10.)];
    let reports = measure_heaps(&layer(vec![("square", square)]), &grid, &params).unwrap();
    let m = &reports[0].metrics;

    assert_eq!(m.flag, ZoneFlag::Ok);
    assert_relative_eq!(m.volume, 1000. / 3., epsilon = 5.);
    assert_relative_eq!(m.surface_area, 100., epsilon = 1e-9);
    assert_relative_eq!(m.coverage_ratio, 0.04, epsilon = 1e-12);
}

#[test]
fn full_extent_conserves_supported_area() {
    let params = unit_params();
    let cloud = PointCloud::new(
        vec![
            PointSample::new(0., 0., 1.),
            PointSample::new(10., 0., 2.),
            PointSample::new(0., 10., 3.),
        ],
        PUWG,
    );
    let grid = steps::compute_dtm(&cloud, &params).unwrap();

    let extent = grid.extent().to_polygon();
    let reports = measure_heaps(&layer(vec![("all", extent)]), &grid, &params).unwrap();

    let supported_area = grid.num_supported() as f64 * grid.transform.cell_area();
    assert_relative_eq!(reports[0].metrics.surface_area, supported_area, epsilon = 1e-9);
}

#[test]
fn volume_decreases_with_base() {
    let grid = steps::compute_dtm(&corner_cloud(), &unit_params()).unwrap();
    let heaps = layer(vec![(
        "p",
        polygon![(x: 1.5, y: 0.5), (x: 9.2, y: 3.3), (x: 7.7, y: 9.6), (x: 2.1, y: 8.)],
    )]);

    let mut last = f64::INFINITY;
    for base in [-1., 0., 2.5, 5., 7.5, 12.] {
        let params = RunParameters {
            base_policy: BasePolicy::Fixed(base),
            ..unit_params()
        };
        let volume = measure_heaps(&heaps, &grid, &params).unwrap()[0].metrics.volume;
        assert!(volume <= last);
        last = volume;
    }
    assert_eq!(last, 0.);
}

#[test]
fn degenerate_and_outside_polygons_are_flagged() {
    let params = unit_params();
    let cloud = PointCloud::new(
        vec![
            PointSample::new(0., 0., 1.),
            PointSample::new(10., 0., 1.),
            PointSample::new(0., 10., 1.),
        ],
        PUWG,
    );
    let grid = steps::compute_dtm(&cloud, &params).unwrap();

    let heaps = layer(vec![
        ("line", polygon![(x: 1., y: 1.), (x: 2., y: 2.), (x: 3., y: 3.)]),
        ("beyond hull", polygon![(x: 8., y: 8.), (x: 10., y: 8.), (x: 10., y: 10.), (x: 8., y: 10.)]),
        ("far away", polygon![(x: 50., y: 50.), (x: 60., y: 50.), (x: 60., y: 60.)]),
        ("inside", polygon![(x: 1., y: 1.), (x: 3., y: 1.), (x: 3., y: 3.), (x: 1., y: 3.)]),
    ]);
    let reports = measure_heaps(&heaps, &grid, &params).unwrap();

    let ids: Vec<&str> = reports.iter().map(|r| r.area.id.as_str()).collect();
    assert_eq!(ids, ["line", "beyond hull", "far away", "inside"]);

    let flags: Vec<ZoneFlag> = reports.iter().map(|r| r.metrics.flag).collect();
    assert_eq!(
        flags,
        [ZoneFlag::EmptyZone, ZoneFlag::NoData, ZoneFlag::EmptyZone, ZoneFlag::Ok]
    );

    for r in &reports[..3] {
        assert_eq!(r.metrics.volume, 0.);
        assert_eq!(r.metrics.surface_area, 0.);
        assert_eq!(r.metrics.coverage_ratio, 0.);
    }
    assert_relative_eq!(reports[3].metrics.volume, 4., epsilon = 1e-9);
}

#[test]
fn sampled_cells_outside_hull_are_not_covered() {
    let params = unit_params();
    let cloud = PointCloud::new(
        vec![
            PointSample::new(0., 0., 1.),
            PointSample::new(10., 0., 1.),
            PointSample::new(5., 10., 1.),
        ],
        PUWG,
    );
    let grid = steps::compute_dtm(&cloud, &params).unwrap();

    // holds the apex sample, but the cell centre is outside the hull
    let sliver = polygon![(x: 5.6, y: 9.1), (x: 6., y: 9.1), (x: 6., y: 10.), (x: 5.6, y: 10.)];
    let m = &measure_heaps(&layer(vec![("apex", sliver)]), &grid, &params).unwrap()[0].metrics;

    assert_eq!(m.flag, ZoneFlag::NoData);
    assert_eq!(m.coverage_ratio, 0.);
    assert_eq!(m.volume, 0.);
    assert_eq!(m.surface_area, 0.);
}

#[test]
fn thread_count_does_not_change_results() {
    let grid = steps::compute_dtm(&corner_cloud(), &unit_params()).unwrap();
    let heaps = layer(
        (0..7)
            .map(|i| {
                let x = i as f64;
                ("p", polygon![(x: x, y: 0.5), (x: x + 2.5, y: 0.5), (x: x + 2.5, y: 9.), (x: x, y: 9.)])
            })
            .collect(),
    );

    let single = measure_heaps(&heaps, &grid, &RunParameters { threads: 1, ..unit_params() }).unwrap();
    let many = measure_heaps(&heaps, &grid, &RunParameters { threads: 4, ..unit_params() }).unwrap();
    assert_eq!(single, many);
}

#[test]
fn crs_mismatch_is_fatal() {
    let grid = steps::compute_dtm(&corner_cloud(), &unit_params()).unwrap();
    let mut heaps = layer(vec![("p", polygon![(x: 1., y: 1.), (x: 2., y: 1.), (x: 2., y: 2.)])]);
    heaps.crs = Crs { epsg: 4326 };

    assert!(matches!(
        measure_heaps(&heaps, &grid, &unit_params()),
        Err(Error::CrsMismatch { .. })
    ));
}

#[test]
fn writes_all_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let params = unit_params();
    let grid = steps::compute_dtm(&corner_cloud(), &params).unwrap();
    let heaps = layer(vec![(
        "square",
        polygon![(x: 0., y: 0.), (x: 10., y: 0.), (x: 10., y: 10.), (x: 0., y: 10.)],
    )]);
    let reports = measure_heaps(&heaps, &grid, &params).unwrap();

    let paths = output_paths(dir.path());
    steps::write_outputs(&paths, PUWG, &grid, &reports, &params).unwrap();

    for name in ["heaps.geojson", "dtm.tif", "dtm.tfw", "dtm.prj", "heaps.csv", "results.geojson"] {
        assert!(dir.path().join(name).is_file(), "{name} was not written");
    }

    // the written polygons read back with the same crs and identifiers
    let text = fs::read_to_string(&paths.polygons).unwrap();
    let read_back = steps::parse_polygons(&text, &params).unwrap();
    assert_eq!(read_back.crs, PUWG);
    assert_eq!(read_back.areas[0].attributes["flag"], "ok");

    let table = fs::read_to_string(&paths.table).unwrap();
    assert_eq!(table.lines().count(), 2);
    assert!(table.lines().nth(1).unwrap().starts_with("square,"));
}

#[test]
fn failed_write_leaves_no_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let params = unit_params();
    let grid = steps::compute_dtm(&corner_cloud(), &params).unwrap();
    let reports = measure_heaps(&layer(vec![]), &grid, &params).unwrap();

    let paths = OutputPaths {
        table: dir.path().join("no/such/dir/heaps.csv"),
        ..output_paths(dir.path())
    };
    let res = steps::write_outputs(&paths, PUWG, &grid, &reports, &params);

    match res {
        Err(Error::WriteFailure { path, .. }) => assert_eq!(path, paths.table),
        other => panic!("expected a write failure, got {other:?}"),
    }
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

/// The corner ramp shifted to puwg 92 coordinates, with a tree and a withheld point on top
fn write_corner_las(path: &Path) {
    let mut builder = Builder::from((1, 4));
    builder.has_wkt_crs = true;
    builder.vlrs.push(Vlr {
        user_id: "LASF_Projection".to_string(),
        record_id: 2112,
        description: "OGC WKT".to_string(),
        data: br#"PROJCS["ETRF2000-PL / CS92",AUTHORITY["EPSG","2180"]]"#.to_vec(),
    });

    let mut writer = Writer::from_path(path, builder.into_header().unwrap()).unwrap();
    for (x, y, z, classification, is_withheld) in [
        (500_000., 300_000., 0., Classification::Ground, false),
        (500_010., 300_000., 0., Classification::Ground, false),
        (500_000., 300_010., 0., Classification::Ground, false),
        (500_010., 300_010., 10., Classification::Ground, false),
        (500_004., 300_006., 25., Classification::HighVegetation, false),
        (500_006., 300_004., 40., Classification::Ground, true),
    ] {
        writer
            .write_point(Point {
                x,
                y,
                z,
                classification,
                is_withheld,
                ..Default::default()
            })
            .unwrap();
    }
    writer.close().unwrap();
}

#[test]
fn make_report_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let point_cloud = dir.path().join("cloud.las");
    write_corner_las(&point_cloud);

    let polygons = dir.path().join("heaps.geojson");
    fs::write(
        &polygons,
        r#"{
            "type": "FeatureCollection",
            "crs": { "type": "name", "properties": { "name": "EPSG:2180" } },
            "features": [{
                "type": "Feature",
                "properties": { "pred_ID": "heap-1" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [500000, 300000], [500010, 300000], [500010, 300010],
                        [500000, 300010], [500000, 300000]
                    ]]
                }
            }]
        }"#,
    )
    .unwrap();

    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let outputs = output_paths(&out);
    let params = RunParameters {
        classes: vec![2],
        ..unit_params()
    };

    let inputs = InputPaths {
        polygons,
        point_cloud,
    };
    let reports = make_report(&inputs, &outputs, &params).unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].area.id, "heap-1");
    let m = &reports[0].metrics;
    assert_eq!(m.flag, ZoneFlag::Ok);
    assert_relative_eq!(m.volume, 1000. / 3., epsilon = 5.);
    assert_relative_eq!(m.surface_area, 100., epsilon = 1e-6);

    for name in ["heaps.geojson", "dtm.tif", "dtm.tfw", "dtm.prj", "heaps.csv", "results.geojson"] {
        assert!(out.join(name).is_file(), "{name} was not written");
    }
    let table = fs::read_to_string(&outputs.table).unwrap();
    assert!(table.lines().nth(1).unwrap().starts_with("heap-1,"));
}

#[test]
fn missing_input_is_reported_first() {
    let dir = tempfile::tempdir().unwrap();
    let polygons = dir.path().join("heaps.geojson");
    fs::write(&polygons, r#"{"type": "FeatureCollection", "features": []}"#).unwrap();

    let inputs = InputPaths {
        polygons,
        point_cloud: dir.path().join("missing.laz"),
    };
    let outputs = output_paths(&dir.path().join("out"));

    match make_report(&inputs, &outputs, &unit_params()) {
        Err(Error::InputNotFound { path }) => assert_eq!(path, inputs.point_cloud),
        other => panic!("expected a missing input, got {other:?}"),
    }
}
