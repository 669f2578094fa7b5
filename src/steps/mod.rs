pub mod compute_dtm;
pub mod compute_metrics;
pub mod extract_zone;
pub mod read_laz;
pub mod read_polygons;
pub mod reconcile_crs;
pub mod write_outputs;

pub use self::compute_dtm::compute_dtm;
pub use self::compute_metrics::{compute_metrics, HeapReport, PolygonMetrics, ZoneFlag};
pub use self::extract_zone::{extract_zone, rasterize_zone, ZoneCell, ZoneExtraction};
pub use self::read_laz::read_laz;
pub use self::read_polygons::{parse_polygons, read_polygons};
pub use self::reconcile_crs::reconcile_crs;
pub use self::write_outputs::{write_outputs, write_polygons, write_table, OutputPaths};
