use crate::raster::ElevationGrid;
use crate::Result;

use tiff::encoder::{colortype::Gray32Float, TiffEncoder};
use tiff::tags::Tag;

use std::io::{Seek, Write};

/// Written into cells without interpolated elevation
pub const NO_DATA: f64 = -9999.;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GT_CITATION: u16 = 1026;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

/// Writes the grid as a single band float32 GeoTIFF, north up with the origin in the top left corner
pub fn write_geotiff<W: Write + Seek>(grid: &ElevationGrid, writer: W) -> Result<()> {
    let t = &grid.transform;
    let geographic = grid.crs.is_geographic()?;

    let citation = format!("{}|", grid.crs);
    let (model_type, crs_key) = if geographic {
        (2, GEOGRAPHIC_TYPE)
    } else {
        (1, PROJECTED_CS_TYPE)
    };
    #[rustfmt::skip]
    let geo_keys: [u16; 20] = [
        1, 1, 0, 4,
        GT_MODEL_TYPE, 0, 1, model_type,
        GT_RASTER_TYPE, 0, 1, 1, // pixel is area
        GT_CITATION, Tag::GeoAsciiParamsTag.to_u16(), citation.len() as u16, 0,
        crs_key, 0, 1, grid.crs.epsg,
    ];

    let data: Vec<f32> = grid
        .field
        .iter()
        .map(|z| z.unwrap_or(NO_DATA) as f32)
        .collect();

    let mut tiff = TiffEncoder::new(writer)?;
    let mut image = tiff.new_image::<Gray32Float>(grid.width as u32, grid.height as u32)?;

    let encoder = image.encoder();
    encoder.write_tag(
        Tag::ModelPixelScaleTag,
        &[t.cell_size, t.cell_size, 0.][..],
    )?;
    encoder.write_tag(
        Tag::ModelTiepointTag,
        &[0., 0., 0., t.tl_coord.x, t.tl_coord.y, 0.][..],
    )?;
    encoder.write_tag(Tag::GeoKeyDirectoryTag, &geo_keys[..])?;
    encoder.write_tag(Tag::GeoAsciiParamsTag, citation.as_str())?;
    encoder.write_tag(
        Tag::GdalNodata,
        format!("{}", NO_DATA as i32).as_str(),
    )?;

    image.write_data(&data)?;
    Ok(())
}

/// ESRI world file for the raster, referenced to the centre of the top left pixel
pub fn write_world_file<W: Write>(grid: &ElevationGrid, mut writer: W) -> Result<()> {
    let t = &grid.transform;
    let centre = t.cell_center(0, 0);
    writer.write_all(
        format!(
            "{}\n0\n0\n-{}\n{}\n{}\n",
            t.cell_size, t.cell_size, centre.x, centre.y
        )
        .as_bytes(),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::Crs;

    use geo::{Coord, Rect};
    use tiff::decoder::{Decoder, DecodingResult};

    use std::io::Cursor;

    #[test]
    fn test_write_geotiff() {
        let bounds = Rect::new(Coord { x: 500_000., y: 300_000. }, Coord { x: 500_003., y: 300_002. });
        let mut grid = ElevationGrid::covering(&bounds, 0.5, Crs { epsg: 2180 }).unwrap();
        grid.field[0] = Some(12.5);

        let mut buffer = Cursor::new(Vec::new());
        write_geotiff(&grid, &mut buffer).unwrap();
        buffer.set_position(0);

        let mut decoder = Decoder::new(buffer).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (6, 4));
        assert_eq!(
            decoder.get_tag_f64_vec(Tag::ModelTiepointTag).unwrap(),
            vec![0., 0., 0., 500_000., 300_002., 0.]
        );
        assert_eq!(
            decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).unwrap(),
            vec![0.5, 0.5, 0.]
        );
        assert_eq!(
            decoder.get_tag_ascii_string(Tag::GdalNodata).unwrap(),
            "-9999"
        );

        let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).unwrap();
        assert_eq!(&keys[12..14], &[GT_CITATION, 34737]);
        assert_eq!(&keys[16..], &[PROJECTED_CS_TYPE, 0, 1, 2180]);
        assert_eq!(
            decoder.get_tag_ascii_string(Tag::GeoAsciiParamsTag).unwrap(),
            "EPSG:2180|"
        );

        let DecodingResult::F32(data) = decoder.read_image().unwrap() else {
            panic!("expected float32 samples");
        };
        assert_eq!(data.len(), 24);
        assert_eq!(data[0], 12.5);
        assert!(data[1..].iter().all(|&z| z == NO_DATA as f32));
    }

    #[test]
    fn test_world_file() {
        let bounds = Rect::new(Coord { x: 10., y: 20. }, Coord { x: 12., y: 22. });
        let grid = ElevationGrid::covering(&bounds, 0.5, Crs { epsg: 2180 }).unwrap();

        let mut buffer = Vec::new();
        write_world_file(&grid, &mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "0.5\n0\n0\n-0.5\n10.25\n21.75\n"
        );
    }
}
