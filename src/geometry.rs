//! Geometric primitives: extents, cell sizes and the
//! affine transform between pixel and world coordinates.
//!
//! Pixel coordinates follow the GDAL convention: pixel
//! `(col, row)` covers `[col, col + 1) x [row, row + 1)`,
//! with rows increasing southward.

use anyhow::{anyhow, Result};
use geo::Rect;
use nalgebra::{Matrix3, Point2};
use serde_derive::{Deserialize, Serialize};

/// Dimensions of a raster as `(cols, rows)`.
pub type RasterDims = (usize, usize);

/// Pixel offset `(col, row)` into a raster.
pub type RasterOffset = (isize, isize);

/// A rectangular window of pixels: offset and size.
pub type RasterWindow = (RasterOffset, RasterDims);

/// Affine transform on homogeneous 2d coordinates.
pub type PixelTransform = Matrix3<f64>;

/// Rectangle in pixel (or world) coordinates.
pub type Bounds = Rect<f64>;

/// Relative tolerance used when snapping coordinates to a
/// grid. Expressed in grid units.
pub(crate) const GRID_EPSILON: f64 = 1e-6;

/// Axis aligned bounding box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Extent {
            xmin: xmin.min(xmax),
            ymin: ymin.min(ymax),
            xmax: xmin.max(xmax),
            ymax: ymin.max(ymax),
        }
    }

    /// Smallest extent containing all the given points.
    /// Non-finite points are skipped.
    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Option<Self> {
        points
            .into_iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .fold(None, |acc: Option<Extent>, (x, y)| {
                Some(match acc {
                    None => Extent::new(x, y, x, y),
                    Some(e) => Extent {
                        xmin: e.xmin.min(x),
                        ymin: e.ymin.min(y),
                        xmax: e.xmax.max(x),
                        ymax: e.ymax.max(y),
                    },
                })
            })
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }

    /// Intersection with a strictly positive area. Extents
    /// that only touch along an edge do not intersect.
    pub fn intersection(&self, other: &Extent) -> Option<Extent> {
        let ext = Extent {
            xmin: self.xmin.max(other.xmin),
            ymin: self.ymin.max(other.ymin),
            xmax: self.xmax.min(other.xmax),
            ymax: self.ymax.min(other.ymax),
        };
        if ext.xmin < ext.xmax && ext.ymin < ext.ymax {
            Some(ext)
        } else {
            None
        }
    }

    pub fn contains(&self, other: &Extent) -> bool {
        self.xmin <= other.xmin
            && self.ymin <= other.ymin
            && self.xmax >= other.xmax
            && self.ymax >= other.ymax
    }

    /// Expand the extent outward to the nearest lines of a
    /// cell grid anchored at `origin` (the top-left corner
    /// of the grid).
    pub fn snap_outward(&self, origin: (f64, f64), cell: CellSize) -> Extent {
        let (ox, oy) = origin;
        let col_min = ((self.xmin - ox) / cell.width + GRID_EPSILON).floor();
        let col_max = ((self.xmax - ox) / cell.width - GRID_EPSILON).ceil();
        let row_min = ((oy - self.ymax) / cell.height + GRID_EPSILON).floor();
        let row_max = ((oy - self.ymin) / cell.height - GRID_EPSILON).ceil();
        Extent {
            xmin: ox + col_min * cell.width,
            xmax: ox + col_max.max(col_min + 1.) * cell.width,
            ymax: oy - row_min * cell.height,
            ymin: oy - row_max.max(row_min + 1.) * cell.height,
        }
    }

    pub fn to_bounds(&self) -> Bounds {
        Rect::new((self.xmin, self.ymin), (self.xmax, self.ymax))
    }

    /// Points along the boundary, `samples` per edge
    /// (including both corners).
    pub fn boundary_points(&self, samples: usize) -> Vec<(f64, f64)> {
        let samples = samples.max(2);
        let step = |a: f64, b: f64, i: usize| a + (b - a) * i as f64 / (samples - 1) as f64;
        let mut pts = Vec::with_capacity(4 * samples);
        for i in 0..samples {
            let x = step(self.xmin, self.xmax, i);
            let y = step(self.ymin, self.ymax, i);
            pts.push((x, self.ymin));
            pts.push((x, self.ymax));
            pts.push((self.xmin, y));
            pts.push((self.xmax, y));
        }
        pts
    }
}

/// Size of a single cell in world units. Both components
/// are positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSize {
    pub width: f64,
    pub height: f64,
}

impl CellSize {
    pub fn new(width: f64, height: f64) -> Self {
        CellSize {
            width: width.abs(),
            height: height.abs(),
        }
    }

    /// Number of whole cells (at least one) needed to cover
    /// the extent. A trailing fraction of a cell counts as a
    /// full cell.
    pub fn dims_for(&self, extent: &Extent) -> RasterDims {
        let cols = (extent.width() / self.width - GRID_EPSILON).ceil().max(1.) as usize;
        let rows = (extent.height() / self.height - GRID_EPSILON).ceil().max(1.) as usize;
        (cols, rows)
    }
}

/// Affine transform from pixel coordinates to world
/// coordinates, and its inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    to_world: PixelTransform,
    to_pixel: PixelTransform,
}

impl GeoTransform {
    /// Construct from the 6 coefficients in GDAL order.
    pub fn from_gdal(t: &[f64; 6]) -> Result<Self> {
        let to_world = Matrix3::new(t[1], t[2], t[0], t[4], t[5], t[3], 0., 0., 1.);
        let to_pixel = to_world
            .try_inverse()
            .ok_or_else(|| anyhow!("geo transform {:?} is not invertible", t))?;
        Ok(GeoTransform { to_world, to_pixel })
    }

    /// North-up transform with the top-left corner at
    /// `origin`.
    pub fn north_up(origin: (f64, f64), cell: CellSize) -> Self {
        let (ox, oy) = origin;
        let to_world = Matrix3::new(cell.width, 0., ox, 0., -cell.height, oy, 0., 0., 1.);
        let to_pixel = Matrix3::new(
            1. / cell.width,
            0.,
            -ox / cell.width,
            0.,
            -1. / cell.height,
            oy / cell.height,
            0.,
            0.,
            1.,
        );
        GeoTransform { to_world, to_pixel }
    }

    #[inline]
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        let pt = self.to_world.transform_point(&Point2::new(col, row));
        (pt.x, pt.y)
    }

    #[inline]
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let pt = self.to_pixel.transform_point(&Point2::new(x, y));
        (pt.x, pt.y)
    }

    /// Size of a pixel in world units, measured along the
    /// pixel axes.
    pub fn cell_size(&self) -> CellSize {
        let t = &self.to_world;
        CellSize::new(t[(0, 0)].hypot(t[(1, 0)]), t[(0, 1)].hypot(t[(1, 1)]))
    }

    /// World extent covered by a raster of the given
    /// dimensions.
    pub fn extent(&self, dims: RasterDims) -> Extent {
        let (cols, rows) = (dims.0 as f64, dims.1 as f64);
        bounding_extent(
            [(0., 0.), (cols, 0.), (0., rows), (cols, rows)]
                .iter()
                .map(|&(c, r)| self.pixel_to_world(c, r)),
        )
    }

    /// Bounds in pixel coordinates of a world extent.
    pub fn pixel_bounds(&self, extent: &Extent) -> Bounds {
        let corners = [
            (extent.xmin, extent.ymin),
            (extent.xmin, extent.ymax),
            (extent.xmax, extent.ymin),
            (extent.xmax, extent.ymax),
        ];
        bounding_extent(corners.iter().map(|&(x, y)| self.world_to_pixel(x, y))).to_bounds()
    }
}

/// Bounding box of four corners.
fn bounding_extent<I: Iterator<Item = (f64, f64)>>(corners: I) -> Extent {
    corners.fold(
        Extent {
            xmin: f64::INFINITY,
            ymin: f64::INFINITY,
            xmax: f64::NEG_INFINITY,
            ymax: f64::NEG_INFINITY,
        },
        |e, (x, y)| Extent {
            xmin: e.xmin.min(x),
            ymin: e.ymin.min(y),
            xmax: e.xmax.max(x),
            ymax: e.ymax.max(y),
        },
    )
}

/// Extension methods on [`Bounds`] expressed in pixel
/// coordinates.
pub trait BoundsExt: Sized {
    /// The window of whole pixels touched by the bounds,
    /// clipped to a raster of dimensions `dim`.
    fn window_from_bounds(&self, dim: RasterDims) -> RasterWindow;
}

impl BoundsExt for Bounds {
    fn window_from_bounds(&self, dim: RasterDims) -> RasterWindow {
        let (l, t) = self.min().x_y();
        let (r, b) = self.max().x_y();

        let clip = |v: f64, max: usize| -> isize { v.max(0.).min(max as f64) as isize };
        let left = clip((l + GRID_EPSILON).floor(), dim.0);
        let top = clip((t + GRID_EPSILON).floor(), dim.1);
        let right = clip((r - GRID_EPSILON).ceil(), dim.0).max(left);
        let bot = clip((b - GRID_EPSILON).ceil(), dim.1).max(top);

        ((left, top), ((right - left) as usize, (bot - top) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_gdal_coefficients() {
        let gt = [100., 2., 0., 500., 0., -2.];
        let t = GeoTransform::from_gdal(&gt).unwrap();
        assert_eq!(t.pixel_to_world(1., 1.), (102., 498.));
        assert_eq!(t.world_to_pixel(102., 498.), (1., 1.));
        assert_eq!(t.cell_size(), CellSize::new(2., 2.));
        assert_eq!(t.extent((10, 5)), Extent::new(100., 490., 120., 500.));
    }

    #[test]
    fn north_up_matches_gdal() {
        let t = GeoTransform::north_up((100., 500.), CellSize::new(2., 3.));
        let g = GeoTransform::from_gdal(&[100., 2., 0., 500., 0., -3.]).unwrap();
        assert_eq!(t.pixel_to_world(3., 7.), g.pixel_to_world(3., 7.));
        assert_eq!(t.extent((4, 4)), g.extent((4, 4)));
        let (c, r) = t.world_to_pixel(104., 494.);
        assert!((c - 2.).abs() < 1e-12 && (r - 2.).abs() < 1e-12);
    }

    #[test]
    fn singular_transform() {
        assert!(GeoTransform::from_gdal(&[0., 0., 0., 0., 0., 0.]).is_err());
    }

    #[test]
    fn intersection_excludes_touching() {
        let a = Extent::new(0., 0., 10., 10.);
        let b = Extent::new(10., 0., 20., 10.);
        assert!(a.intersection(&b).is_none());
        assert_eq!(a.union(&b), Extent::new(0., 0., 20., 10.));

        let c = Extent::new(5., 5., 15., 15.);
        assert_eq!(a.intersection(&c), Some(Extent::new(5., 5., 10., 10.)));
    }

    #[test]
    fn snap_outward_to_grid() {
        let cell = CellSize::new(10., 10.);
        let e = Extent::new(12., -37., 48., -1.);
        assert_eq!(
            e.snap_outward((0., 0.), cell),
            Extent::new(10., -40., 50., 0.)
        );

        // Already aligned extents are left untouched.
        let e = Extent::new(10., -40., 50., 0.);
        assert_eq!(e.snap_outward((0., 0.), cell), e);
    }

    #[test]
    fn window_from_bounds_clips() {
        let b: Bounds = Rect::new((-1.5, 0.5), (2.5, 3.));
        assert_eq!(b.window_from_bounds((2, 10)), ((0, 0), (2, 3)));

        let b: Bounds = Rect::new((5., 5.), (6., 6.));
        assert_eq!(b.window_from_bounds((10, 10)), ((5, 5), (1, 1)));
        assert_eq!(b.window_from_bounds((3, 3)), ((3, 3), (0, 0)));
    }

    #[test]
    fn dims_cover_partial_cells() {
        let cell = CellSize::new(1., 1.);
        assert_eq!(cell.dims_for(&Extent::new(0., 0., 20., 10.)), (20, 10));
        assert_eq!(cell.dims_for(&Extent::new(0., 0., 20.4, 10.)), (21, 10));
        assert_eq!(cell.dims_for(&Extent::new(0., 0., 0.2, 0.2)), (1, 1));
        // Rounding noise does not add a cell.
        let cell = CellSize::new(0.01, 0.01);
        assert_eq!(cell.dims_for(&Extent::new(10., 20., 13., 21.)), (300, 100));
    }
}
