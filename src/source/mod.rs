//! Raster sources and the codecs that open them.

use crate::crs::Crs;
use crate::error::Result;
use crate::geometry::{CellSize, Extent};
use crate::layout::LayoutDefinition;
use crate::raster::GeoRaster;
use crate::reproject::reproject;
use crate::resample::ResampleMethod;
use crate::tile_source::LayoutTileSource;
use anyhow::bail;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(feature = "gdal")]
pub mod gdal;
pub mod native;

pub use self::native::NativeCodec;

/// A decoded raster and the name it was opened from.
///
/// Immutable. Clones share the decoded cells.
#[derive(Debug, Clone)]
pub struct RasterSource {
    name: String,
    raster: Arc<GeoRaster>,
}

impl RasterSource {
    pub fn new<S: Into<String>>(name: S, raster: GeoRaster) -> Self {
        RasterSource {
            name: name.into(),
            raster: Arc::new(raster),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raster(&self) -> &GeoRaster {
        &self.raster
    }

    pub fn extent(&self) -> Extent {
        self.raster.extent()
    }

    pub fn crs(&self) -> &Crs {
        self.raster.crs()
    }

    pub fn cell_size(&self) -> CellSize {
        self.raster.cell_size()
    }

    pub fn band_count(&self) -> usize {
        self.raster.band_count()
    }

    /// A new source in the `target` CRS. Sources already in
    /// `target` are returned as is.
    pub fn reproject(&self, target: &Crs, method: ResampleMethod) -> anyhow::Result<RasterSource> {
        if self.crs() == target {
            return Ok(self.clone());
        }
        Ok(RasterSource {
            name: self.name.clone(),
            raster: Arc::new(reproject(&self.raster, target, method)?),
        })
    }

    /// Bind the source to a tile grid.
    pub fn tile_to_layout(&self, layout: &LayoutDefinition, method: ResampleMethod) -> LayoutTileSource {
        LayoutTileSource::new(self.clone(), *layout, method)
    }
}

/// Decodes raster files into [`RasterSource`]s.
pub trait RasterCodec: Send + Sync {
    fn open(&self, path: &str) -> anyhow::Result<RasterSource>;
}

/// Raster decoding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// GeoTIFF decoding in pure Rust.
    #[default]
    Native,
    /// Any format GDAL reads. Needs the `gdal` feature.
    Gdal,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::Gdal => "gdal",
        }
    }

    /// The codec of this backend, if compiled in.
    pub fn codec(&self) -> Result<Box<dyn RasterCodec>> {
        match self {
            Backend::Native => Ok(Box::new(NativeCodec)),
            #[cfg(feature = "gdal")]
            Backend::Gdal => Ok(Box::new(self::gdal::GdalCodec)),
            #[cfg(not(feature = "gdal"))]
            Backend::Gdal => Err(crate::error::Error::BackendUnavailable(self.name())),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "native" | "tiff" => Backend::Native,
            "gdal" | "external_gdal" => Backend::Gdal,
            _ => bail!("unknown raster backend {:?}", s),
        })
    }
}
