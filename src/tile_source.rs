//! Raster sources bound to a tile grid.

use crate::crs::Crs;
use crate::geometry::{BoundsExt, CellSize, Extent};
use crate::layout::{KeyBounds, LayoutDefinition, SpatialKey};
use crate::resample::ResampleMethod;
use crate::source::RasterSource;
use crate::tile::MultibandTile;

/// A [`RasterSource`] bound to a [`LayoutDefinition`].
/// Reads the tiles of the layout that the source covers,
/// resampling its cells onto the layout's cell grid.
#[derive(Debug, Clone)]
pub struct LayoutTileSource {
    source: RasterSource,
    layout: LayoutDefinition,
    method: ResampleMethod,
    extent: Extent,
    key_bounds: Option<KeyBounds>,
}

impl LayoutTileSource {
    pub fn new(source: RasterSource, layout: LayoutDefinition, method: ResampleMethod) -> Self {
        let snapped = source
            .extent()
            .snap_outward(layout.origin(), layout.cell_size());
        let extent = layout.extent.intersection(&snapped).unwrap_or(snapped);
        let key_bounds = layout.key_bounds_for(&extent);
        LayoutTileSource {
            source,
            layout,
            method,
            extent,
            key_bounds,
        }
    }

    pub fn source(&self) -> &RasterSource {
        &self.source
    }

    pub fn layout(&self) -> &LayoutDefinition {
        &self.layout
    }

    /// Source extent snapped outward to the layout cell
    /// grid and clipped to the layout.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn crs(&self) -> &Crs {
        self.source.crs()
    }

    pub fn cell_size(&self) -> CellSize {
        self.layout.cell_size()
    }

    pub fn band_count(&self) -> usize {
        self.source.band_count()
    }

    /// Keys of the tiles the source overlaps, `None` if it
    /// lies outside the layout.
    pub fn key_bounds(&self) -> Option<KeyBounds> {
        self.key_bounds
    }

    /// Keys of the tiles the source overlaps, row-major.
    pub fn keys(&self) -> Vec<SpatialKey> {
        self.key_bounds
            .map(|kb| kb.keys().collect())
            .unwrap_or_default()
    }

    /// Resample the source onto the tile at `key`. `None`
    /// when the tile holds no data from this source.
    pub fn read(&self, key: SpatialKey) -> Option<MultibandTile> {
        if !self.key_bounds?.contains(&key) {
            return None;
        }
        let tile_extent = self.layout.tile_extent(key);
        let overlap = tile_extent.intersection(&self.source.extent())?;

        let raster = self.source.raster();
        let (tile_cols, tile_rows) = self.layout.tile_dims();
        let tile_t = self.layout.tile_transform(key);
        let cell = self.layout.cell_size();

        let ((c0, r0), (w, h)) = tile_t
            .pixel_bounds(&overlap)
            .window_from_bounds((tile_cols, tile_rows));

        let mut tile = MultibandTile::empty(tile_cols, tile_rows, raster.band_count());
        let mut values = vec![f64::NAN; raster.band_count()];
        for row in r0 as usize..r0 as usize + h {
            for col in c0 as usize..c0 as usize + w {
                let (x, y) = tile_t.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5);
                let center = raster.transform().world_to_pixel(x, y);
                let cell_extent = Extent::new(
                    x - cell.width / 2.,
                    y - cell.height / 2.,
                    x + cell.width / 2.,
                    y + cell.height / 2.,
                );
                let footprint = raster.transform().pixel_bounds(&cell_extent);
                self.method.sample(raster, center, &footprint, &mut values);
                for (band, &v) in values.iter().enumerate() {
                    tile.band_mut(band)[(row, col)] = v;
                }
            }
        }

        if tile.has_data() {
            Some(tile)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeoTransform;
    use crate::layout::TileLayout;
    use crate::raster::GeoRaster;
    use ndarray::Array2;

    fn layout() -> LayoutDefinition {
        LayoutDefinition::new(
            Extent::new(0., 0., 8., 8.),
            TileLayout {
                layout_cols: 2,
                layout_rows: 2,
                tile_cols: 4,
                tile_rows: 4,
            },
        )
    }

    fn source(origin: (f64, f64), dims: (usize, usize)) -> RasterSource {
        let band = Array2::from_shape_fn((dims.1, dims.0), |(r, c)| (r * 10 + c) as f64);
        let t = GeoTransform::north_up(origin, CellSize::new(1., 1.));
        RasterSource::new("s", GeoRaster::new(vec![band], t, Crs::lat_lng()).unwrap())
    }

    #[test]
    fn aligned_source() {
        // Covers the top-left tile and half of its right
        // neighbour.
        let src = source((0., 8.), (6, 4)).tile_to_layout(&layout(), ResampleMethod::NearestNeighbor);
        assert_eq!(src.extent(), Extent::new(0., 4., 6., 8.));
        assert_eq!(src.keys(), vec![SpatialKey::new(0, 0), SpatialKey::new(1, 0)]);

        let t = src.read(SpatialKey::new(0, 0)).unwrap();
        assert_eq!(t.band(0)[(2, 3)], 23.);

        let t = src.read(SpatialKey::new(1, 0)).unwrap();
        assert_eq!(t.band(0)[(0, 0)], 4.);
        assert_eq!(t.band(0)[(3, 1)], 35.);
        assert!(t.band(0)[(0, 2)].is_nan());

        assert!(src.read(SpatialKey::new(0, 1)).is_none());
        assert!(src.read(SpatialKey::new(5, 5)).is_none());
    }

    #[test]
    fn misaligned_source_snaps_outward() {
        let src = source((0.5, 7.5), (2, 2)).tile_to_layout(&layout(), ResampleMethod::NearestNeighbor);
        assert_eq!(src.extent(), Extent::new(0., 5., 3., 8.));
        // Layout cell centers fall on source cell corners.
        let t = src.read(SpatialKey::new(0, 0)).unwrap();
        assert_eq!(t.band(0)[(0, 0)], 0.);
        assert_eq!(t.band(0)[(1, 1)], 11.);
        assert!(t.band(0)[(2, 2)].is_nan());
        assert!(t.band(0)[(0, 3)].is_nan());
    }

    #[test]
    fn outside_layout() {
        let src = source((20., 20.), (2, 2)).tile_to_layout(&layout(), ResampleMethod::NearestNeighbor);
        assert_eq!(src.key_bounds(), None);
        assert!(src.keys().is_empty());
        assert!(src.read(SpatialKey::new(0, 0)).is_none());
    }

    #[test]
    fn all_nan_tile_is_skipped() {
        let t = GeoTransform::north_up((0., 8.), CellSize::new(1., 1.));
        let band = Array2::from_elem((4, 4), f64::NAN);
        let src = RasterSource::new("nan", GeoRaster::new(vec![band], t, Crs::lat_lng()).unwrap())
            .tile_to_layout(&layout(), ResampleMethod::Bilinear);
        assert_eq!(src.keys(), vec![SpatialKey::new(0, 0)]);
        assert!(src.read(SpatialKey::new(0, 0)).is_none());
    }
}
