use crate::{Error, Result};

use proj4rs::Proj;

use std::fmt::Display;

/// WGS84, the implied crs of any GeoJSON file without a crs member (RFC 7946)
pub const WGS84: Crs = Crs { epsg: 4326 };

/// A coordinate reference system identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    pub epsg: u16,
}

impl Crs {
    pub fn from_epsg(epsg: u16) -> Result<Crs> {
        if crs_definitions::from_code(epsg).is_none() {
            return Err(Error::CrsUndefined(format!("unknown EPSG code {epsg}")));
        }
        Ok(Crs { epsg })
    }

    /// Parses the common ways of naming a crs in GeoJSON and on the command line,
    /// `EPSG:2180`, `urn:ogc:def:crs:EPSG::2180`, `OGC:CRS84` or a bare code
    pub fn parse(name: &str) -> Result<Crs> {
        let trimmed = name.trim();
        let upper = trimmed.to_ascii_uppercase();

        if upper.ends_with("CRS84") {
            return Ok(WGS84);
        }

        let code = if upper.contains("EPSG") {
            // the code is always the last colon separated token, the urn form may carry a version in between
            upper.rsplit(':').next().unwrap_or_default()
        } else {
            upper.as_str()
        };

        code.parse::<u16>()
            .map_err(|_| Error::CrsUndefined(format!("cannot parse '{trimmed}' as an EPSG code")))
            .and_then(Crs::from_epsg)
    }

    pub fn from_las_header(header: &las::Header) -> Result<Crs> {
        let epsg = las_crs::parse_las_crs(header).map_err(|e| {
            Error::CrsUndefined(format!("no usable crs in the lidar header ({e:?})"))
        })?;
        Crs::from_epsg(epsg.horizontal)
    }

    pub fn proj(&self) -> Result<Proj> {
        Proj::from_epsg_code(self.epsg)
            .map_err(|e| Error::CrsUndefined(format!("{self} has no projection definition ({e})")))
    }

    pub fn wkt(&self) -> Option<&'static str> {
        crs_definitions::from_code(self.epsg).map(|def| def.wkt)
    }

    pub fn is_geographic(&self) -> Result<bool> {
        Ok(self.proj()?.is_latlong())
    }

    /// The urn GeoJSON writers use for a named crs
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg)
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}
