//! In-memory geo-referenced rasters.

use crate::crs::Crs;
use crate::geometry::{CellSize, Extent, GeoTransform, RasterDims};
use anyhow::{bail, Result};
use ndarray::Array2;

/// A decoded raster: one or more bands of `f64` cells with
/// a geo transform and CRS. Missing data is `NaN`.
///
/// Bands are indexed `[(row, col)]`.
#[derive(Debug, Clone)]
pub struct GeoRaster {
    bands: Vec<Array2<f64>>,
    transform: GeoTransform,
    crs: Crs,
}

impl GeoRaster {
    pub fn new(bands: Vec<Array2<f64>>, transform: GeoTransform, crs: Crs) -> Result<Self> {
        let shape = match bands.first() {
            Some(b) => b.dim(),
            None => bail!("raster has no bands"),
        };
        if shape.0 == 0 || shape.1 == 0 {
            bail!("raster has zero size");
        }
        if bands.iter().any(|b| b.dim() != shape) {
            bail!("raster bands differ in size");
        }
        Ok(GeoRaster {
            bands,
            transform,
            crs,
        })
    }

    /// Dimensions as `(cols, rows)`.
    pub fn dims(&self) -> RasterDims {
        let (rows, cols) = self.bands[0].dim();
        (cols, rows)
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[Array2<f64>] {
        &self.bands
    }

    pub fn band(&self, idx: usize) -> &Array2<f64> {
        &self.bands[idx]
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn extent(&self) -> Extent {
        self.transform.extent(self.dims())
    }

    pub fn cell_size(&self) -> CellSize {
        self.transform.cell_size()
    }

    /// Value at a pixel, `NaN` outside the raster.
    #[inline]
    pub fn value(&self, band: usize, col: isize, row: isize) -> f64 {
        let (cols, rows) = self.dims();
        if col < 0 || row < 0 || col as usize >= cols || row as usize >= rows {
            return f64::NAN;
        }
        self.bands[band][(row as usize, col as usize)]
    }
}

/// Replace cells equal to `no_data` with `NaN`.
pub fn mask_no_data(band: &mut Array2<f64>, no_data: Option<f64>) {
    if let Some(no_val) = no_data {
        if no_val.is_nan() {
            return;
        }
        band.mapv_inplace(|v| if v == no_val { f64::NAN } else { v });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_bands() {
        let t = GeoTransform::north_up((0., 0.), CellSize::new(1., 1.));
        let bands = vec![Array2::zeros((2, 3)), Array2::zeros((3, 2))];
        assert!(GeoRaster::new(bands, t, Crs::lat_lng()).is_err());
        assert!(GeoRaster::new(vec![], t, Crs::lat_lng()).is_err());
    }

    #[test]
    fn value_outside_is_nan() {
        let t = GeoTransform::north_up((0., 4.), CellSize::new(1., 1.));
        let band = Array2::from_shape_fn((4, 3), |(r, c)| (r * 10 + c) as f64);
        let raster = GeoRaster::new(vec![band], t, Crs::lat_lng()).unwrap();
        assert_eq!(raster.dims(), (3, 4));
        assert_eq!(raster.extent(), Extent::new(0., 0., 3., 4.));
        assert_eq!(raster.value(0, 2, 3), 32.);
        assert!(raster.value(0, 3, 0).is_nan());
        assert!(raster.value(0, -1, 0).is_nan());
    }

    #[test]
    fn masks_no_data() {
        let mut band = Array2::from_elem((2, 2), 1.);
        band[(0, 1)] = -9999.;
        mask_no_data(&mut band, Some(-9999.));
        assert!(band[(0, 1)].is_nan());
        assert_eq!(band[(1, 1)], 1.);
    }
}
