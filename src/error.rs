use std::path::PathBuf;

use thiserror::Error;

use crate::crs::Crs;

pub type Result<T> = std::result::Result<T, Error>;

/// crate specific Error enum
#[derive(Error, Debug)]
pub enum Error {
    #[error("Input file {} does not exist or is not readable", .path.display())]
    InputNotFound { path: PathBuf },
    #[error("Could not resolve a coordinate reference system: {0}")]
    CrsUndefined(String),
    #[error("Coordinate reference systems do not match, expected {expected} but found {found}")]
    CrsMismatch { expected: Crs, found: Crs },
    #[error("At least 3 points are needed to build a terrain model, found {found}")]
    InsufficientData { found: usize },
    #[error("All points are collinear or coincident, the terrain cannot be interpolated")]
    DegenerateGeometry,
    #[error("Grid resolution must be a positive number, got {0}")]
    InvalidResolution(f64),
    #[error("Could not write output file {}: {source}", .path.display())]
    WriteFailure { path: PathBuf, source: Box<Error> },
    #[error("Could not read the lidar attribute: {0}")]
    AttributeUndefined(String),
    #[error("Unsupported polygon input: {0}")]
    UnsupportedGeometry(String),
    #[error(transparent)]
    ProjError(#[from] proj4rs::errors::Error),
    #[error(transparent)]
    LasError(#[from] las::Error),
    #[error(transparent)]
    GeoJsonError(#[from] geojson::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    TiffError(#[from] tiff::TiffError),
    #[error(transparent)]
    CsvError(#[from] csv::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
