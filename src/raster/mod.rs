pub mod dtm;
pub mod geotiff;
pub mod tin;

pub use self::dtm::{ElevationGrid, GridTransform};
pub use self::geotiff::{write_geotiff, write_world_file, NO_DATA};
pub use self::tin::{mask_unsupported, Tin};
