use crate::crs::Crs;

use std::fmt::Display;

/// Immutable settings for one run, passed by reference to every step
#[derive(Clone, Debug)]
pub struct RunParameters {
    // dtm parameters
    pub resolution: f64,
    pub interpolation: InterpolationParameters,

    // volume parameters
    pub base_policy: BasePolicy,
    pub allow_cut: bool,

    // input parameters
    pub lidar_crs: Option<Crs>,
    pub polygon_crs: Option<Crs>,
    pub classes: Vec<u8>,
    pub attribute_filter: Option<AttributeFilter>,
    pub id_field: String,

    pub threads: usize,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            resolution: 0.1,
            interpolation: Default::default(),
            base_policy: Default::default(),
            allow_cut: false,
            lidar_crs: None,
            polygon_crs: None,
            classes: Vec::new(),
            attribute_filter: None,
            id_field: "pred_ID".to_string(),
            threads: 1,
        }
    }
}

/// Keeps the lidar points whose extra bytes attribute `name` equals `value`,
/// e.g. `pred_class` = 0 for the terrain points of a segmented cloud
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeFilter {
    pub name: String,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InterpolationParameters {
    pub method: InterpolationMethod,
    // cells farther than this from the closest sample are left empty
    pub support_distance: Option<f64>,
    // triangles with a longer edge are not gridded
    pub max_triangle_edge_length: Option<f64>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMethod {
    #[default]
    Linear,
    NaturalNeighbor,
}

impl Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpolationMethod::Linear => f.write_str("Linear"),
            InterpolationMethod::NaturalNeighbor => f.write_str("Natural neighbor"),
        }
    }
}

/// How the reference elevation under a heap is chosen
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum BasePolicy {
    Fixed(f64),
    #[default]
    ZoneMinimum,
    BoundaryRing,
}

impl Display for BasePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BasePolicy::Fixed(z) => write!(f, "Fixed ({z:.3})"),
            BasePolicy::ZoneMinimum => f.write_str("Zone minimum"),
            BasePolicy::BoundaryRing => f.write_str("Boundary ring"),
        }
    }
}
