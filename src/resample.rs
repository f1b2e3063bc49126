//! Pixel resampling kernels.
//!
//! All kernels operate in the pixel coordinates of the
//! source raster and ignore `NaN` cells. A target pixel
//! without any valid source cell resamples to `NaN`.

use crate::geometry::{Bounds, BoundsExt};
use crate::raster::GeoRaster;
use anyhow::bail;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;

/// Rule used to compute a target cell from source cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleMethod {
    #[default]
    NearestNeighbor,
    Bilinear,
    CubicConvolution,
    Lanczos,
    Average,
    Min,
    Max,
    Mode,
    Median,
}

impl ResampleMethod {
    /// Area methods aggregate every source cell under the
    /// target cell footprint; point methods sample at the
    /// target cell center.
    pub fn is_area(&self) -> bool {
        !matches!(
            self,
            ResampleMethod::NearestNeighbor
                | ResampleMethod::Bilinear
                | ResampleMethod::CubicConvolution
                | ResampleMethod::Lanczos
        )
    }

    /// Resample every band of `raster` for a target cell
    /// centered at `center` covering `footprint` (both in
    /// source pixel coordinates). `out` receives one value
    /// per band.
    pub fn sample(&self, raster: &GeoRaster, center: (f64, f64), footprint: &Bounds, out: &mut [f64]) {
        debug_assert_eq!(out.len(), raster.band_count());
        if !self.is_area() {
            for (band, v) in out.iter_mut().enumerate() {
                *v = self.interpolate(raster, band, center);
            }
            return;
        }

        let (off, size) = footprint.window_from_bounds(raster.dims());
        let mut cells = Vec::with_capacity(size.0 * size.1);
        for (band, v) in out.iter_mut().enumerate() {
            cells.clear();
            for r in off.1..off.1 + size.1 as isize {
                for c in off.0..off.0 + size.0 as isize {
                    let val = raster.value(band, c, r);
                    if !val.is_nan() {
                        cells.push(val);
                    }
                }
            }
            *v = self.aggregate(&mut cells);
        }
    }

    fn interpolate(&self, raster: &GeoRaster, band: usize, center: (f64, f64)) -> f64 {
        match self {
            ResampleMethod::NearestNeighbor => {
                raster.value(band, center.0.floor() as isize, center.1.floor() as isize)
            }
            ResampleMethod::Bilinear => bilinear(raster, band, center),
            ResampleMethod::CubicConvolution => convolve(raster, band, center, 2, cubic),
            ResampleMethod::Lanczos => convolve(raster, band, center, LANCZOS_RADIUS, lanczos),
            _ => unreachable!("area methods do not interpolate"),
        }
    }

    fn aggregate(&self, cells: &mut [f64]) -> f64 {
        if cells.is_empty() {
            return f64::NAN;
        }
        match self {
            ResampleMethod::Average => cells.iter().sum::<f64>() / cells.len() as f64,
            ResampleMethod::Min => cells.iter().cloned().fold(f64::INFINITY, f64::min),
            ResampleMethod::Max => cells.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            ResampleMethod::Median => {
                cells.sort_by(f64::total_cmp);
                let mid = cells.len() / 2;
                if cells.len() % 2 == 0 {
                    (cells[mid - 1] + cells[mid]) / 2.
                } else {
                    cells[mid]
                }
            }
            ResampleMethod::Mode => {
                // Most frequent value; ties go to the smallest.
                cells.sort_by(f64::total_cmp);
                let mut best = (cells[0], 0);
                let mut run = (cells[0], 0);
                for &v in cells.iter() {
                    if v == run.0 {
                        run.1 += 1;
                    } else {
                        run = (v, 1);
                    }
                    if run.1 > best.1 {
                        best = run;
                    }
                }
                best.0
            }
            _ => unreachable!("point methods do not aggregate"),
        }
    }
}

/// Bilinear interpolation between the four cell centers
/// around `center`. `NaN` neighbours are left out and the
/// remaining weights renormalised.
fn bilinear(raster: &GeoRaster, band: usize, center: (f64, f64)) -> f64 {
    let (cols, rows) = raster.dims();
    let (px, py) = center;
    if px < 0. || py < 0. || px >= cols as f64 || py >= rows as f64 {
        return f64::NAN;
    }

    let x = px - 0.5;
    let y = py - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let clamp_col = |c: f64| c.max(0.).min((cols - 1) as f64) as isize;
    let clamp_row = |r: f64| r.max(0.).min((rows - 1) as f64) as isize;

    let neighbours = [
        (clamp_col(x0), clamp_row(y0), (1. - fx) * (1. - fy)),
        (clamp_col(x0 + 1.), clamp_row(y0), fx * (1. - fy)),
        (clamp_col(x0), clamp_row(y0 + 1.), (1. - fx) * fy),
        (clamp_col(x0 + 1.), clamp_row(y0 + 1.), fx * fy),
    ];

    let mut sum = 0.;
    let mut weight = 0.;
    for &(c, r, w) in neighbours.iter() {
        let v = raster.value(band, c, r);
        if !v.is_nan() && w > 0. {
            sum += v * w;
            weight += w;
        }
    }
    if weight > 0. {
        sum / weight
    } else {
        // Every weighted neighbour is missing; fall back to
        // the containing cell.
        raster.value(band, px.floor() as isize, py.floor() as isize)
    }
}

const LANCZOS_RADIUS: isize = 3;

/// Keys cubic convolution kernel with `a = -0.5`.
fn cubic(x: f64) -> f64 {
    let x = x.abs();
    if x < 1. {
        (1.5 * x - 2.5) * x * x + 1.
    } else if x < 2. {
        ((-0.5 * x + 2.5) * x - 4.) * x + 2.
    } else {
        0.
    }
}

fn lanczos(x: f64) -> f64 {
    let a = LANCZOS_RADIUS as f64;
    if x == 0. {
        1.
    } else if x.abs() < a {
        let px = std::f64::consts::PI * x;
        a * px.sin() * (px / a).sin() / (px * px)
    } else {
        0.
    }
}

/// Separable convolution over the `2 * radius` cell
/// centers nearest to `center` along each axis. `NaN`
/// cells are left out and the remaining weights
/// renormalised.
fn convolve(raster: &GeoRaster, band: usize, center: (f64, f64), radius: isize, kernel: fn(f64) -> f64) -> f64 {
    let (cols, rows) = raster.dims();
    let (px, py) = center;
    if px < 0. || py < 0. || px >= cols as f64 || py >= rows as f64 {
        return f64::NAN;
    }

    let x = px - 0.5;
    let y = py - 0.5;
    let (x0, y0) = (x.floor() as isize, y.floor() as isize);

    let mut sum = 0.;
    let mut weight = 0.;
    for r in y0 - radius + 1..=y0 + radius {
        let wy = kernel(y - r as f64);
        let rr = r.max(0).min(rows as isize - 1);
        for c in x0 - radius + 1..=x0 + radius {
            let w = wy * kernel(x - c as f64);
            let cc = c.max(0).min(cols as isize - 1);
            let v = raster.value(band, cc, rr);
            if !v.is_nan() && w != 0. {
                sum += v * w;
                weight += w;
            }
        }
    }
    if weight.abs() > f64::EPSILON {
        sum / weight
    } else {
        raster.value(band, px.floor() as isize, py.floor() as isize)
    }
}

impl FromStr for ResampleMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        use ResampleMethod::*;
        let name: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        Ok(match name.as_str() {
            "near" | "nearest" | "nearestneighbor" | "nearestneighbour" => NearestNeighbor,
            "bilinear" => Bilinear,
            "cubic" | "cubicconvolution" => CubicConvolution,
            "lanczos" => Lanczos,
            "average" | "avg" | "mean" => Average,
            "min" => Min,
            "max" => Max,
            "mode" => Mode,
            "median" | "med" => Median,
            _ => bail!("unknown resample method {:?}", s),
        })
    }
}
