//! Aggregate description of a set of rasters.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::geometry::{CellSize, Extent};
use crate::source::RasterSource;
use crate::tile_source::LayoutTileSource;

/// CRS, combined extent, finest cell size, total number of
/// cells and the largest band count of a set of rasters.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSummary {
    crs: Crs,
    extent: Extent,
    cell_size: CellSize,
    cells: u64,
    bands: usize,
}

impl RasterSummary {
    pub fn new(crs: Crs, extent: Extent, cell_size: CellSize, cells: u64, bands: usize) -> Self {
        RasterSummary {
            crs,
            extent,
            cell_size,
            cells,
            bands,
        }
    }

    fn single(crs: &Crs, extent: Extent, cell_size: CellSize, bands: usize) -> Self {
        let (cols, rows) = cell_size.dims_for(&extent);
        RasterSummary::new(crs.clone(), extent, cell_size, (cols * rows) as u64, bands)
    }

    fn combine(self, other: RasterSummary) -> Result<Self> {
        if self.crs != other.crs {
            return Err(Error::MixedCrs {
                expected: self.crs.to_string(),
                found: other.crs.to_string(),
            });
        }
        Ok(RasterSummary {
            crs: self.crs,
            extent: self.extent.union(&other.extent),
            cell_size: CellSize::new(
                self.cell_size.width.min(other.cell_size.width),
                self.cell_size.height.min(other.cell_size.height),
            ),
            cells: self.cells + other.cells,
            bands: self.bands.max(other.bands),
        })
    }

    fn fold<I: IntoIterator<Item = RasterSummary>>(items: I) -> Result<Self> {
        let mut items = items.into_iter();
        let first = items.next().ok_or(Error::EmptyInput)?;
        items.try_fold(first, RasterSummary::combine)
    }

    /// Summarise raster sources in their own CRS.
    pub fn from_sources(sources: &[RasterSource]) -> Result<Self> {
        RasterSummary::fold(sources.iter().map(|s| {
            RasterSummary::single(s.crs(), s.extent(), s.cell_size(), s.band_count())
        }))
    }

    /// Summarise sources bound to a layout: extents are
    /// snapped to the layout grid and the cell size is the
    /// layout's.
    pub fn from_layout_sources(sources: &[LayoutTileSource]) -> Result<Self> {
        RasterSummary::fold(sources.iter().map(|s| {
            RasterSummary::single(s.crs(), s.extent(), s.cell_size(), s.band_count())
        }))
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn cell_size(&self) -> CellSize {
        self.cell_size
    }

    pub fn cells(&self) -> u64 {
        self.cells
    }

    pub fn bands(&self) -> usize {
        self.bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeoTransform;
    use crate::raster::GeoRaster;
    use ndarray::Array2;

    fn source(name: &str, origin: (f64, f64), cell: f64, dims: (usize, usize), bands: usize, crs: Crs) -> RasterSource {
        let t = GeoTransform::north_up(origin, CellSize::new(cell, cell));
        let bands = vec![Array2::zeros((dims.1, dims.0)); bands];
        RasterSource::new(name, GeoRaster::new(bands, t, crs).unwrap())
    }

    #[test]
    fn aggregates_sources() {
        let a = source("a", (0., 10.), 1., (10, 10), 1, Crs::lat_lng());
        let b = source("b", (10., 20.), 0.5, (4, 8), 3, Crs::lat_lng());
        let s = RasterSummary::from_sources(&[a, b]).unwrap();
        assert_eq!(s.extent(), &Extent::new(0., 0., 12., 20.));
        assert_eq!(s.cell_size(), CellSize::new(0.5, 0.5));
        assert_eq!(s.cells(), 100 + 32);
        assert_eq!(s.bands(), 3);
        assert_eq!(s.crs(), &Crs::lat_lng());
    }

    #[test]
    fn rejects_empty_and_mixed() {
        assert!(matches!(RasterSummary::from_sources(&[]), Err(Error::EmptyInput)));

        let a = source("a", (0., 10.), 1., (10, 10), 1, Crs::lat_lng());
        let b = source("b", (0., 10.), 1., (10, 10), 1, Crs::web_mercator());
        assert!(matches!(
            RasterSummary::from_sources(&[a, b]),
            Err(Error::MixedCrs { .. })
        ));
    }
}
