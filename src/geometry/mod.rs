pub mod clip;
pub mod point_cloud;
pub mod polygon_area;

pub use self::clip::{clipped_area, Rings};
pub use self::point_cloud::{PointCloud, PointSample};
pub use self::polygon_area::{PolygonArea, PolygonLayer};
