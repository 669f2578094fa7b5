pub mod crs;
pub mod error;
pub mod geometry;
pub mod make_report;
pub mod parameters;
pub mod raster;
pub mod steps;

pub use error::{Error, Result};
pub use make_report::{make_report, measure_heaps, InputPaths};
