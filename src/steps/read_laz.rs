use crate::crs::Crs;
use crate::geometry::{PointCloud, PointSample};
use crate::parameters::RunParameters;
use crate::{Error, Result};

use las::{Header, Reader};
use log::{debug, info, warn};

use std::path::Path;

const EXTRA_BYTES_DESCRIPTOR_LEN: usize = 192;

/// Reads the lidar samples of the selected classes together with the crs of the file.
/// Withheld points and points with non-finite coordinates are skipped.
pub fn read_laz(las_path: &Path, params: &RunParameters) -> Result<PointCloud> {
    if !las_path.is_file() {
        return Err(Error::InputNotFound {
            path: las_path.to_path_buf(),
        });
    }

    let mut las_reader = Reader::from_path(las_path)?;

    let header = las_reader.header();
    let num_points = header.number_of_points();
    let crs = match params.lidar_crs {
        Some(crs) => crs,
        None => Crs::from_las_header(header)?,
    };
    info!(
        "Reading {num_points} lidar points in {crs} from {}",
        las_path.display()
    );

    let attribute = match &params.attribute_filter {
        Some(filter) => Some((ExtraAttribute::find(header, &filter.name)?, filter.value)),
        None => None,
    };

    let mut points = Vec::with_capacity(num_points as usize);
    let mut num_invalid = 0;
    for p in las_reader.points() {
        let p = p?;

        if p.is_withheld {
            continue;
        }
        if !params.classes.is_empty() && !params.classes.contains(&u8::from(p.classification)) {
            continue;
        }
        if let Some((attribute, value)) = &attribute {
            if attribute.value(&p.extra_bytes) != Some(*value) {
                continue;
            }
        }
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            num_invalid += 1;
            continue;
        }

        points.push(PointSample::new(p.x, p.y, p.z));
    }

    if num_invalid > 0 {
        warn!("Skipped {num_invalid} lidar points with non-finite coordinates");
    }
    info!("Kept {} of {num_points} lidar points", points.len());

    let cloud = PointCloud::new(points, crs);
    match cloud.z_range() {
        Some((lo, hi)) => debug!("Lidar elevations range from {lo:.2} to {hi:.2}"),
        None => return Err(Error::InsufficientData { found: 0 }),
    }

    Ok(cloud)
}

/// Position and encoding of one attribute inside the extra bytes of a point
#[derive(Clone, Copy, Debug, PartialEq)]
struct ExtraAttribute {
    start: usize,
    data_type: u8,
    scale: f64,
    offset: f64,
}

impl ExtraAttribute {
    /// Looks `name` up in the extra bytes descriptors of the header
    fn find(header: &Header, name: &str) -> Result<ExtraAttribute> {
        let descriptors = header
            .all_vlrs()
            .find(|vlr| vlr.user_id.eq_ignore_ascii_case("LASF_Spec") && vlr.record_id == 4)
            .ok_or_else(|| {
                Error::AttributeUndefined(format!("the lidar header describes no extra bytes, {name} is missing"))
            })?;

        let mut start = 0;
        for d in descriptors.data.chunks_exact(EXTRA_BYTES_DESCRIPTOR_LEN) {
            let data_type = d[2];
            let options = d[3];
            let size = match data_type {
                // undocumented bytes, the options hold their count
                0 => options as usize,
                1 | 2 => 1,
                3 | 4 => 2,
                5 | 6 | 9 => 4,
                7 | 8 | 10 => 8,
                other => {
                    return Err(Error::AttributeUndefined(format!(
                        "extra bytes of data type {other} are not supported"
                    )))
                }
            };

            let field = String::from_utf8_lossy(&d[4..36]);
            if field.trim_end_matches('\0') == name {
                if data_type == 0 {
                    return Err(Error::AttributeUndefined(format!("{name} has no documented data type")));
                }
                return Ok(ExtraAttribute {
                    start,
                    data_type,
                    scale: if options & 8 != 0 { f64::from_le_bytes(le8(&d[112..120])) } else { 1. },
                    offset: if options & 16 != 0 { f64::from_le_bytes(le8(&d[136..144])) } else { 0. },
                });
            }
            start += size;
        }

        Err(Error::AttributeUndefined(format!("the lidar points have no {name} attribute")))
    }

    /// The scaled value of the attribute, `None` if the point carries too few extra bytes
    fn value(&self, extra_bytes: &[u8]) -> Option<f64> {
        let b = extra_bytes.get(self.start..)?;
        let raw = match self.data_type {
            1 => *b.first()? as f64,
            2 => *b.first()? as i8 as f64,
            3 => u16::from_le_bytes([*b.first()?, *b.get(1)?]) as f64,
            4 => i16::from_le_bytes([*b.first()?, *b.get(1)?]) as f64,
            5 => u32::from_le_bytes(le4(b.get(..4)?)) as f64,
            6 => i32::from_le_bytes(le4(b.get(..4)?)) as f64,
            7 => u64::from_le_bytes(le8(b.get(..8)?)) as f64,
            8 => i64::from_le_bytes(le8(b.get(..8)?)) as f64,
            9 => f32::from_le_bytes(le4(b.get(..4)?)) as f64,
            10 => f64::from_le_bytes(le8(b.get(..8)?)),
            _ => return None,
        };
        Some(raw * self.scale + self.offset)
    }
}

fn le4(b: &[u8]) -> [u8; 4] {
    let mut a = [0; 4];
    a.copy_from_slice(&b[..4]);
    a
}

fn le8(b: &[u8]) -> [u8; 8] {
    let mut a = [0; 8];
    a.copy_from_slice(&b[..8]);
    a
}
