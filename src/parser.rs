use heap_volume::{
    crs::Crs,
    parameters::{
        AttributeFilter, BasePolicy, InterpolationMethod, InterpolationParameters, RunParameters,
    },
    steps::OutputPaths,
    InputPaths, Result,
};

use std::path::PathBuf;

use clap::Parser;
/// Compute stockpile volumes, footprint areas and lidar coverage for the polygons of a GeoJSON file
#[derive(Parser, Clone, Debug)]
#[command(version)]
pub struct Args {
    /// Path to the GeoJSON file with the heap polygons
    pub input_geojson: PathBuf,

    /// Path of the GeoJSON output, the input polygons in the crs of the lidar with the results appended
    pub output_geojson: PathBuf,

    /// Path to the .las/.laz point cloud
    pub las_file: PathBuf,

    /// Path of the GeoTIFF elevation model output
    pub output_raster: PathBuf,

    /// Path of the CSV table output
    pub output_csv: PathBuf,

    /// Optional path of a GeoJSON output holding only the identifier and the results
    pub results_geojson: Option<PathBuf>,

    /// Grid cell size of the elevation model in crs units, default 0.1
    #[arg(short, long, default_value_t = 0.1)]
    pub resolution: f64,

    /// Interpolation method, linear (TIN) or natural (natural neighbour)
    #[arg(short, long, default_value = "linear", value_parser = parse_method)]
    pub method: InterpolationMethod,

    /// Leave cells farther than this from the closest lidar point without elevation
    #[arg(long)]
    pub support_distance: Option<f64>,

    /// Leave cells under triangles with a longer edge than this without elevation
    #[arg(long)]
    pub max_edge: Option<f64>,

    /// Base elevation of the volumes: min (lowest terrain in the polygon), ring (mean terrain along the outline) or a fixed elevation
    #[arg(short, long, default_value = "min", value_parser = parse_base)]
    pub base: BasePolicy,

    /// Let terrain below the base subtract from the volume
    #[clap(long, action)]
    pub allow_cut: bool,

    /// EPSG code of the point cloud, overrides the crs in the las header
    #[arg(long)]
    pub lidar_epsg: Option<u16>,

    /// EPSG code of the polygons, overrides the crs member of the GeoJSON file
    #[arg(long)]
    pub polygon_epsg: Option<u16>,

    /// Only use lidar points of this classification, may be repeated. Defaults to all points
    #[arg(short, long = "class")]
    pub classes: Vec<u8>,

    /// Only use lidar points whose extra bytes attribute has this value, given as NAME=VALUE (e.g. pred_class=0)
    #[arg(long, value_parser = parse_attribute_filter)]
    pub attribute: Option<AttributeFilter>,

    /// Polygon property holding the identifier of each heap
    #[arg(long, default_value = "pred_ID")]
    pub id_field: String,

    /// Number of threads used for measuring, defaults to all available threads
    #[arg(short, long, default_value_t = std::thread::available_parallelism().map_or(1, |n| n.get()))]
    pub threads: usize,
}

impl Args {
    pub fn run_parameters(&self) -> Result<RunParameters> {
        Ok(RunParameters {
            resolution: self.resolution,
            interpolation: InterpolationParameters {
                method: self.method,
                support_distance: self.support_distance,
                max_triangle_edge_length: self.max_edge,
            },
            base_policy: self.base,
            allow_cut: self.allow_cut,
            lidar_crs: self.lidar_epsg.map(Crs::from_epsg).transpose()?,
            polygon_crs: self.polygon_epsg.map(Crs::from_epsg).transpose()?,
            classes: self.classes.clone(),
            attribute_filter: self.attribute.clone(),
            id_field: self.id_field.clone(),
            threads: self.threads.max(1),
        })
    }

    pub fn input_paths(&self) -> InputPaths {
        InputPaths {
            polygons: self.input_geojson.clone(),
            point_cloud: self.las_file.clone(),
        }
    }

    pub fn output_paths(&self) -> OutputPaths {
        OutputPaths {
            polygons: self.output_geojson.clone(),
            raster: self.output_raster.clone(),
            table: self.output_csv.clone(),
            results: self.results_geojson.clone(),
        }
    }
}

fn parse_method(s: &str) -> std::result::Result<InterpolationMethod, String> {
    match s.to_ascii_lowercase().as_str() {
        "linear" | "tin" => Ok(InterpolationMethod::Linear),
        "natural" | "natural-neighbor" | "nn" => Ok(InterpolationMethod::NaturalNeighbor),
        other => Err(format!(
            "unknown interpolation method '{other}', expected linear or natural"
        )),
    }
}

fn parse_base(s: &str) -> std::result::Result<BasePolicy, String> {
    match s.to_ascii_lowercase().as_str() {
        "min" | "minimum" => Ok(BasePolicy::ZoneMinimum),
        "ring" | "boundary" => Ok(BasePolicy::BoundaryRing),
        other => other
            .parse::<f64>()
            .ok()
            .filter(|z| z.is_finite())
            .map(BasePolicy::Fixed)
            .ok_or_else(|| format!("'{other}' is neither min, ring nor an elevation")),
    }
}

fn parse_attribute_filter(s: &str) -> std::result::Result<AttributeFilter, String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("'{s}' is not of the form NAME=VALUE"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for {name}: {e}"))?;

    Ok(AttributeFilter {
        name: name.trim().to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments() {
        let args = Args::try_parse_from([
            "HeapVolume", "in.geojson", "out.geojson", "cloud.laz", "dtm.tif", "table.csv",
        ])
        .unwrap();

        assert!(args.results_geojson.is_none());
        let params = args.run_parameters().unwrap();
        assert_eq!(params.resolution, 0.1);
        assert_eq!(params.base_policy, BasePolicy::ZoneMinimum);
        assert_eq!(params.id_field, "pred_ID");

        assert!(Args::try_parse_from(["HeapVolume", "in.geojson", "out.geojson"]).is_err());
    }

    #[test]
    fn test_options() {
        let args = Args::try_parse_from([
            "HeapVolume", "in.geojson", "out.geojson", "cloud.laz", "dtm.tif", "table.csv",
            "results.geojson", "--base", "101.5", "--method", "natural", "--class", "2",
            "--class", "8", "--lidar-epsg", "2180", "--allow-cut", "--attribute", "pred_class=0",
        ])
        .unwrap();

        assert_eq!(args.results_geojson, Some(PathBuf::from("results.geojson")));
        let params = args.run_parameters().unwrap();
        assert_eq!(params.base_policy, BasePolicy::Fixed(101.5));
        assert_eq!(params.interpolation.method, InterpolationMethod::NaturalNeighbor);
        assert_eq!(params.classes, vec![2, 8]);
        assert_eq!(params.lidar_crs, Some(Crs { epsg: 2180 }));
        assert!(params.allow_cut);
        assert_eq!(
            params.attribute_filter,
            Some(AttributeFilter {
                name: "pred_class".to_string(),
                value: 0.
            })
        );

        assert!(Args::try_parse_from([
            "HeapVolume", "a", "b", "c", "d", "e", "--base", "lowest",
        ])
        .is_err());
        assert!(Args::try_parse_from([
            "HeapVolume", "a", "b", "c", "d", "e", "--attribute", "pred_class",
        ])
        .is_err());
    }
}
