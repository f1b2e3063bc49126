//! Coordinate reference systems and transforms between
//! them, in pure Rust (`proj4rs` with EPSG definitions from
//! `crs-definitions`).

use crate::error::Error;
use crate::geometry::Extent;
use anyhow::{anyhow, bail, Context, Result};
use proj4rs::proj::Proj;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// EPSG code for web mercator projection CRS.
pub const WEB_MERCATOR_EPSG: u32 = 3857;

/// Legacy code of the web mercator projection.
pub const GOOGLE_MERCATOR_EPSG: u32 = 900913;

/// EPSG code for WGS84 longitude / latitude.
pub const LAT_LNG_EPSG: u32 = 4326;

const WEB_MERCATOR_PROJ4: &str =
    "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs";
const LAT_LNG_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Half the width of the web mercator world, in meters.
pub const WEB_MERCATOR_MAX_COORD: f64 = 20037508.342789244;

/// A coordinate reference system, identified by an
/// optional EPSG code and its PROJ.4 definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crs {
    epsg: Option<u32>,
    proj4: String,
}

impl Crs {
    pub fn web_mercator() -> Self {
        Crs {
            epsg: Some(WEB_MERCATOR_EPSG),
            proj4: WEB_MERCATOR_PROJ4.into(),
        }
    }

    pub fn lat_lng() -> Self {
        Crs {
            epsg: Some(LAT_LNG_EPSG),
            proj4: LAT_LNG_PROJ4.into(),
        }
    }

    /// Look up an EPSG code in the bundled definitions.
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            WEB_MERCATOR_EPSG | GOOGLE_MERCATOR_EPSG => return Ok(Crs::web_mercator()),
            LAT_LNG_EPSG => return Ok(Crs::lat_lng()),
            _ => {}
        }
        let short = u16::try_from(code).with_context(|| format!("EPSG:{} is out of range", code))?;
        let def = crs_definitions::from_code(short)
            .ok_or_else(|| anyhow!("EPSG:{} is not in the crs-definitions database", code))?;
        let proj4 = def.proj4.trim();
        Proj::from_proj_string(proj4)
            .map_err(|e| anyhow!("invalid definition for EPSG:{}: {:?}", code, e))?;
        Ok(Crs {
            epsg: Some(code),
            proj4: proj4.into(),
        })
    }

    pub fn from_proj4(proj4: &str) -> Result<Self> {
        let proj4 = proj4.trim();
        Proj::from_proj_string(proj4).map_err(|e| anyhow!("invalid PROJ.4 string: {:?}", e))?;
        Ok(Crs {
            epsg: None,
            proj4: proj4.into(),
        })
    }

    /// Parse a user supplied CRS: `EPSG:<code>`, a bare
    /// `<code>`, or a PROJ.4 string starting with `+`.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        Crs::parse_any(raw).map_err(|_| Error::InvalidCrs(raw.into()))
    }

    fn parse_any(raw: &str) -> Result<Self> {
        let s = raw.trim();
        if s.starts_with('+') {
            return Crs::from_proj4(s);
        }
        let code = match s.split_once(':') {
            Some((auth, code)) if auth.eq_ignore_ascii_case("epsg") => code,
            Some((auth, _)) => bail!("unknown CRS authority {}", auth),
            None => s,
        };
        let code: u32 = code
            .trim()
            .parse()
            .with_context(|| format!("parsing EPSG code {:?}", code))?;
        Crs::from_epsg(code)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn proj4(&self) -> &str {
        &self.proj4
    }

    /// Coordinates are longitude / latitude in degrees.
    pub fn is_geographic(&self) -> bool {
        self.proj4.contains("+proj=longlat") || self.proj4.contains("+proj=latlong")
    }

    pub fn is_web_mercator(&self) -> bool {
        matches!(self.epsg, Some(WEB_MERCATOR_EPSG) | Some(GOOGLE_MERCATOR_EPSG))
            || (self.proj4.contains("+proj=merc")
                && self.proj4.contains("+a=6378137")
                && self.proj4.contains("+b=6378137"))
    }

    /// The extent of the whole world in this CRS, if the
    /// CRS has a well-known one.
    pub fn world_extent(&self) -> Option<Extent> {
        if self.is_web_mercator() {
            let m = WEB_MERCATOR_MAX_COORD;
            Some(Extent::new(-m, -m, m, m))
        } else if self.is_geographic() {
            Some(Extent::new(-180., -90., 180., 90.))
        } else {
            None
        }
    }

    fn proj(&self) -> Result<Proj> {
        Proj::from_proj_string(&self.proj4)
            .map_err(|e| anyhow!("invalid PROJ.4 string for {}: {:?}", self, e))
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => self.proj4 == other.proj4,
        }
    }
}
impl Eq for Crs {}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.epsg {
            Some(code) => write!(f, "EPSG:{}", code),
            None => write!(f, "{}", self.proj4),
        }
    }
}

/// Transforms coordinates from one CRS to another.
/// Geographic coordinates are in degrees on both ends.
pub struct CrsTransform {
    projs: Option<(Proj, Proj)>,
    src_geographic: bool,
    dst_geographic: bool,
}

impl CrsTransform {
    pub fn new(src: &Crs, dst: &Crs) -> Result<Self> {
        let projs = if src == dst {
            None
        } else {
            Some((src.proj()?, dst.proj()?))
        };
        Ok(CrsTransform {
            projs,
            src_geographic: src.is_geographic(),
            dst_geographic: dst.is_geographic(),
        })
    }

    pub fn is_identity(&self) -> bool {
        self.projs.is_none()
    }

    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (src, dst) = match &self.projs {
            None => return Ok((x, y)),
            Some(projs) => projs,
        };

        let mut point = if self.src_geographic {
            (x.to_radians(), y.to_radians(), 0.)
        } else {
            (x, y, 0.)
        };
        proj4rs::transform::transform(src, dst, &mut point)
            .map_err(|e| anyhow!("transforming ({}, {}): {:?}", x, y, e))?;

        let out = if self.dst_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !out.0.is_finite() || !out.1.is_finite() {
            bail!("transforming ({}, {}): result is not finite", x, y);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_epsg_forms() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::lat_lng());
        assert_eq!(Crs::parse("epsg:3857").unwrap(), Crs::web_mercator());
        assert_eq!(Crs::parse("4326").unwrap(), Crs::lat_lng());
        assert_eq!(Crs::parse("EPSG:32633").unwrap().epsg(), Some(32633));
    }

    #[test]
    fn google_mercator_alias() {
        let crs = Crs::parse("EPSG:900913").unwrap();
        assert_eq!(crs, Crs::web_mercator());
        assert_eq!(crs.epsg(), Some(WEB_MERCATOR_EPSG));
        assert!(crs.is_web_mercator());
    }

    #[test]
    fn codes_beyond_u16() {
        // 70000 would wrap to 4464 if narrowed.
        assert!(Crs::from_epsg(70000).is_err());
        assert!(Crs::from_epsg(4464 + (1 << 16)).is_err());
        assert!(matches!(Crs::parse("EPSG:70000"), Err(Error::InvalidCrs(_))));
    }

    #[test]
    fn parse_proj4() {
        let crs = Crs::parse("+proj=longlat +datum=WGS84 +no_defs").unwrap();
        assert!(crs.is_geographic());
        assert_eq!(crs.epsg(), None);
        assert!(crs.world_extent().is_some());
    }

    #[test]
    fn parse_failures() {
        for raw in &["", "EPSG:", "EPSG:abc", "FOO:4326", "not a crs", "EPSG:99999"] {
            match Crs::parse(raw) {
                Err(Error::InvalidCrs(s)) => assert_eq!(&s, raw),
                other => panic!("{:?} parsed as {:?}", raw, other),
            }
        }
    }

    #[test]
    fn world_extents() {
        let m = WEB_MERCATOR_MAX_COORD;
        assert_eq!(
            Crs::web_mercator().world_extent(),
            Some(Extent::new(-m, -m, m, m))
        );
        assert_eq!(
            Crs::lat_lng().world_extent(),
            Some(Extent::new(-180., -90., 180., 90.))
        );
        assert_eq!(Crs::from_epsg(32633).unwrap().world_extent(), None);
    }

    #[test]
    fn lat_lng_to_web_mercator() {
        let t = CrsTransform::new(&Crs::lat_lng(), &Crs::web_mercator()).unwrap();
        let (x, y) = t.transform(0., 0.).unwrap();
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);

        let (x, _) = t.transform(180., 0.).unwrap();
        assert!((x - WEB_MERCATOR_MAX_COORD).abs() < 1e-3, "x = {}", x);

        let back = CrsTransform::new(&Crs::web_mercator(), &Crs::lat_lng()).unwrap();
        let (x, y) = t.transform(10., 51.5).unwrap();
        let (lon, lat) = back.transform(x, y).unwrap();
        assert!((lon - 10.).abs() < 1e-6 && (lat - 51.5).abs() < 1e-6);
    }

    #[test]
    fn identity_transform() {
        let t = CrsTransform::new(&Crs::lat_lng(), &Crs::lat_lng()).unwrap();
        assert!(t.is_identity());
        assert_eq!(t.transform(1.5, 2.5).unwrap(), (1.5, 2.5));
    }
}
