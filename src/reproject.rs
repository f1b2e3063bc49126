//! Warp rasters between coordinate reference systems.
//!
//! The output grid is north-up with square cells. Its
//! extent is the bounding box of the densified source
//! boundary in the target CRS, and its cell size keeps the
//! number of pixels along the diagonal of the source.
//! Every output cell is back-projected into the source
//! raster and resampled there.

use crate::crs::{Crs, CrsTransform};
use crate::geometry::{CellSize, Extent, GeoTransform};
use crate::raster::GeoRaster;
use crate::resample::ResampleMethod;
use anyhow::{bail, Context, Result};
use geo::Rect;
use ndarray::Array2;

/// Samples per edge when projecting the source boundary.
const EDGE_SAMPLES: usize = 21;

/// Output grid of a reprojection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpGrid {
    pub extent: Extent,
    pub cell_size: CellSize,
    pub cols: usize,
    pub rows: usize,
}

/// Compute the output grid for warping `raster` into
/// `target`.
pub fn warp_grid(raster: &GeoRaster, target: &Crs) -> Result<WarpGrid> {
    let forward = CrsTransform::new(raster.crs(), target)?;

    let (cols, rows) = raster.dims();
    let pix = Extent::new(0., 0., cols as f64, rows as f64);
    let points = pix.boundary_points(EDGE_SAMPLES).into_iter().filter_map(|(c, r)| {
        let (x, y) = raster.transform().pixel_to_world(c, r);
        forward.transform(x, y).ok()
    });
    let extent = match Extent::from_points(points) {
        Some(e) if e.width() > 0. && e.height() > 0. => e,
        _ => bail!("source extent does not project into {}", target),
    };

    let src_diag = (cols as f64).hypot(rows as f64);
    let res = extent.width().hypot(extent.height()) / src_diag;
    let cols = (extent.width() / res).ceil().max(1.) as usize;
    let rows = (extent.height() / res).ceil().max(1.) as usize;
    let extent = Extent::new(
        extent.xmin,
        extent.ymax - rows as f64 * res,
        extent.xmin + cols as f64 * res,
        extent.ymax,
    );

    Ok(WarpGrid {
        extent,
        cell_size: CellSize::new(res, res),
        cols,
        rows,
    })
}

/// Reproject `raster` into `target` using `method`.
pub fn reproject(raster: &GeoRaster, target: &Crs, method: ResampleMethod) -> Result<GeoRaster> {
    let inverse = CrsTransform::new(target, raster.crs())?;
    if inverse.is_identity() {
        return Ok(raster.clone());
    }

    let grid = warp_grid(raster, target).context("computing output grid")?;
    let out_t = GeoTransform::north_up((grid.extent.xmin, grid.extent.ymax), grid.cell_size);

    // Approximate footprint of an output cell in source
    // pixels, used by the area methods.
    let (src_cols, src_rows) = raster.dims();
    let half_w = 0.5 * (src_cols as f64 / grid.cols as f64).max(1.);
    let half_h = 0.5 * (src_rows as f64 / grid.rows as f64).max(1.);

    let nbands = raster.band_count();
    let mut bands = vec![Array2::from_elem((grid.rows, grid.cols), f64::NAN); nbands];
    let mut values = vec![f64::NAN; nbands];

    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let (x, y) = out_t.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5);
            let (sx, sy) = match inverse.transform(x, y) {
                Ok(pt) => pt,
                Err(_) => continue,
            };
            let center = raster.transform().world_to_pixel(sx, sy);
            let footprint = Rect::new(
                (center.0 - half_w, center.1 - half_h),
                (center.0 + half_w, center.1 + half_h),
            );
            method.sample(raster, center, &footprint, &mut values);
            for (band, &v) in bands.iter_mut().zip(values.iter()) {
                band[(row, col)] = v;
            }
        }
    }

    GeoRaster::new(bands, out_t, target.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crs::WEB_MERCATOR_MAX_COORD;

    fn lat_lng_raster() -> GeoRaster {
        // 1 degree cells over lon [0, 10), lat [0, 10)
        let band = Array2::from_shape_fn((10, 10), |(r, c)| (r * 10 + c) as f64);
        let t = GeoTransform::north_up((0., 10.), CellSize::new(1., 1.));
        GeoRaster::new(vec![band], t, Crs::lat_lng()).unwrap()
    }

    #[test]
    fn same_crs_is_identity() {
        let r = lat_lng_raster();
        let out = reproject(&r, &Crs::lat_lng(), ResampleMethod::Bilinear).unwrap();
        assert_eq!(out.band(0), r.band(0));
        assert_eq!(out.transform(), r.transform());
    }

    #[test]
    fn grid_to_web_mercator() {
        let r = lat_lng_raster();
        let grid = warp_grid(&r, &Crs::web_mercator()).unwrap();

        let deg = WEB_MERCATOR_MAX_COORD / 180.;
        assert!((grid.extent.xmin - 0.).abs() < 1e-3);
        assert!(grid.extent.xmax >= 10. * deg - 1e-3);
        assert!(grid.extent.ymin <= 1e-3);
        assert!((grid.extent.ymax - 1118889.974).abs() < 1., "ymax = {}", grid.extent.ymax);
        assert_eq!(grid.cell_size.width, grid.cell_size.height);
        assert!(grid.cols >= 9 && grid.cols <= 11, "cols = {}", grid.cols);
        assert!(grid.rows >= 9 && grid.rows <= 11, "rows = {}", grid.rows);
    }

    #[test]
    fn reproject_preserves_values() {
        let r = lat_lng_raster();
        let out = reproject(&r, &Crs::web_mercator(), ResampleMethod::NearestNeighbor).unwrap();
        assert_eq!(out.crs(), &Crs::web_mercator());

        // Values stay within the source range, and the
        // top-left corner keeps its value.
        let band = out.band(0);
        assert!(band.iter().filter(|v| !v.is_nan()).all(|&v| v >= 0. && v < 100.));
        assert_eq!(band[(0, 0)], 0.);
    }
}
