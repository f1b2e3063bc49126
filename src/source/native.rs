//! GeoTIFF decoding with the `tiff` crate.
//!
//! Only the first image of the file is read. The geo
//! transform comes from `ModelTransformationTag`, or from
//! `ModelPixelScaleTag` with `ModelTiepointTag`. The CRS is
//! the EPSG code in the GeoKey directory. `GDAL_NODATA`
//! cells become `NaN`.

use super::{RasterCodec, RasterSource};
use crate::crs::Crs;
use crate::geometry::GeoTransform;
use crate::raster::{mask_no_data, GeoRaster};
use anyhow::{bail, Context, Result};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

pub(crate) const MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const MODEL_TIEPOINT: u16 = 33922;
pub(crate) const MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const GEO_KEY_DIRECTORY: u16 = 34735;
pub(crate) const GDAL_NODATA: u16 = 42113;

pub(crate) const GEOGRAPHIC_TYPE_KEY: u32 = 2048;
pub(crate) const PROJECTED_CS_TYPE_KEY: u32 = 3072;

/// GeoTIFF codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCodec;

impl RasterCodec for NativeCodec {
    fn open(&self, path: &str) -> Result<RasterSource> {
        let file = File::open(path).with_context(|| format!("opening {}", path))?;
        let raster = read_geotiff(BufReader::new(file)).with_context(|| format!("decoding {}", path))?;
        Ok(RasterSource::new(path, raster))
    }
}

/// Decode a GeoTIFF from a reader.
pub fn read_geotiff<R: Read + Seek>(reader: R) -> Result<GeoRaster> {
    let mut decoder = Decoder::new(reader)?.with_limits(Limits::unlimited());
    let (width, height) = decoder.dimensions()?;
    let (cols, rows) = (width as usize, height as usize);

    let transform = read_transform(&mut decoder)?;
    let crs = read_crs(&mut decoder)?;
    let no_data = decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse::<f64>().ok());

    let cells: Vec<f64> = match decoder.read_image()? {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
        #[allow(unreachable_patterns)]
        _ => bail!("unsupported sample format"),
    };

    let npix = cols * rows;
    if npix == 0 || cells.len() % npix != 0 {
        bail!(
            "decoded {} samples for a {}x{} image",
            cells.len(),
            cols,
            rows
        );
    }
    let nbands = cells.len() / npix;

    // Samples are interleaved per pixel.
    let bands = (0..nbands)
        .map(|b| {
            let mut band = Array2::from_shape_fn((rows, cols), |(r, c)| cells[(r * cols + c) * nbands + b]);
            mask_no_data(&mut band, no_data);
            band
        })
        .collect();

    GeoRaster::new(bands, transform, crs)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TRANSFORMATION)) {
        if m.len() < 8 {
            bail!("model transformation has {} values", m.len());
        }
        // Row-major 4x4 matrix; only the 2d part is used.
        return GeoTransform::from_gdal(&[m[3], m[0], m[1], m[7], m[4], m[5]]);
    }

    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE))
        .context("missing geo-referencing: no pixel scale or transformation")?;
    let tie = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT))
        .context("missing geo-referencing: no tie point")?;
    if scale.len() < 2 || tie.len() < 6 {
        bail!("malformed pixel scale or tie point");
    }
    let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
    let (sx, sy) = (scale[0], scale[1]);
    GeoTransform::from_gdal(&[x - i * sx, sx, 0., y + j * sy, 0., -sy])
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Crs> {
    let keys = decoder
        .get_tag_u32_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))
        .context("missing GeoKey directory")?;
    if keys.len() < 4 {
        bail!("truncated GeoKey directory");
    }

    let lookup = |id: u32| {
        keys[4..]
            .chunks_exact(4)
            .find(|k| k[0] == id && k[1] == 0)
            .map(|k| k[3])
    };
    let code = lookup(PROJECTED_CS_TYPE_KEY)
        .or_else(|| lookup(GEOGRAPHIC_TYPE_KEY))
        .filter(|&c| c != 0 && c != 32767)
        .context("no EPSG code in GeoKey directory")?;
    Crs::from_epsg(code)
}
