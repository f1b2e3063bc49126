//! Raster decoding through GDAL.

use super::{RasterCodec, RasterSource};
use crate::crs::Crs;
use crate::geometry::{GeoTransform, RasterDims};
use crate::raster::{mask_no_data, GeoRaster};
use anyhow::{format_err, Context, Result};
use gdal::raster::RasterBand;
use gdal::Dataset;
use ndarray::Array2;

/// Codec for every format GDAL reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalCodec;

impl RasterCodec for GdalCodec {
    fn open(&self, path: &str) -> Result<RasterSource> {
        let ds = Dataset::open(path).with_context(|| format!("opening {}", path))?;
        let raster = read_dataset(&ds).with_context(|| format!("decoding {}", path))?;
        Ok(RasterSource::new(path, raster))
    }
}

/// Read every band of a dataset as `f64`.
pub fn read_dataset(ds: &Dataset) -> Result<GeoRaster> {
    let transform = GeoTransform::from_gdal(&ds.geo_transform()?)?;
    let crs = dataset_crs(ds)?;
    let size = ds.raster_size();

    let bands = (1..=ds.raster_count())
        .map(|idx| {
            let band = ds.rasterband(idx)?;
            let mut cells = read_band(&band, size)
                .with_context(|| format_err!("reading band {}", idx))?;
            mask_no_data(&mut cells, band.no_data_value());
            Ok(cells)
        })
        .collect::<Result<Vec<_>>>()?;

    GeoRaster::new(bands, transform, crs)
}

fn read_band(band: &RasterBand, size: RasterDims) -> Result<Array2<f64>> {
    let buf = band.read_as::<f64>((0, 0), size, size, None)?;
    Ok(Array2::from_shape_vec((size.1, size.0), buf.data)?)
}

/// The dataset CRS by EPSG code if it has one, else by
/// its PROJ.4 export.
fn dataset_crs(ds: &Dataset) -> Result<Crs> {
    let srs = ds.spatial_ref().context("dataset has no spatial reference")?;
    if let Ok(code) = srs.auth_code() {
        if let Ok(crs) = u32::try_from(code).map_err(anyhow::Error::from).and_then(Crs::from_epsg) {
            return Ok(crs);
        }
    }
    Crs::from_proj4(&srs.to_proj4()?)
}
