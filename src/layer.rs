//! Tiled layers: the output of ingestion.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::geometry::{Bounds, Extent, GeoTransform};
use crate::layout::{zoomed, KeyBounds, LayoutDefinition, SpatialKey};
use crate::raster::GeoRaster;
use crate::resample::ResampleMethod;
use crate::stats::BandStats;
use crate::summary::RasterSummary;
use crate::tile::MultibandTile;
use geo::Rect;
use ndarray::{s, Array2};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Describes a tiled layer: its grid, CRS, the extent of
/// its data and the keys that may hold tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayerMetadata {
    pub zoom: u32,
    pub layout_definition: LayoutDefinition,
    pub crs: Crs,
    pub extent: Extent,
    pub key_bounds: KeyBounds,
    pub bands: usize,
}

impl TileLayerMetadata {
    /// Metadata for data described by `summary` on the
    /// grid `layout`. Fails if the grid does not overlap
    /// the data.
    pub fn new(zoom: u32, layout: LayoutDefinition, summary: &RasterSummary) -> Result<Self> {
        let key_bounds = layout.key_bounds_for(summary.extent()).ok_or_else(|| {
            Error::UnsupportedPolicy(format!(
                "layout {:?} does not cover data extent {:?}",
                layout.extent,
                summary.extent()
            ))
        })?;
        Ok(TileLayerMetadata {
            zoom,
            layout_definition: layout,
            crs: summary.crs().clone(),
            extent: *summary.extent(),
            key_bounds,
            bands: summary.bands(),
        })
    }
}

/// Tiles keyed by grid position, with their metadata.
/// Every key lies within the metadata's key bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct TiledLayer {
    metadata: TileLayerMetadata,
    tiles: BTreeMap<SpatialKey, MultibandTile>,
}

impl TiledLayer {
    pub fn new(metadata: TileLayerMetadata, tiles: BTreeMap<SpatialKey, MultibandTile>) -> Self {
        debug_assert!(tiles.keys().all(|k| metadata.key_bounds.contains(k)));
        TiledLayer { metadata, tiles }
    }

    pub fn metadata(&self) -> &TileLayerMetadata {
        &self.metadata
    }

    /// Tiles in row-major key order.
    pub fn tiles(&self) -> impl Iterator<Item = (&SpatialKey, &MultibandTile)> {
        self.tiles.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SpatialKey> {
        self.tiles.keys()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn get(&self, key: &SpatialKey) -> Option<&MultibandTile> {
        self.tiles.get(key)
    }

    /// The tile at `(col, row)`. Positions outside the key
    /// bounds are an error; positions inside without data
    /// give `None`.
    pub fn lookup(&self, col: usize, row: usize) -> Result<Option<&MultibandTile>> {
        let key = SpatialKey::new(col, row);
        if !self.metadata.key_bounds.contains(&key) {
            return Err(Error::KeyOutOfBounds {
                key,
                bounds: self.metadata.key_bounds,
            });
        }
        Ok(self.tiles.get(&key))
    }

    /// Smallest and largest cell over all bands.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let stats = self.band_stats().iter().fold(BandStats::default(), |mut acc, s| {
            acc += s;
            acc
        });
        Some((stats.min()?, stats.max()?))
    }

    pub fn band_stats(&self) -> Vec<BandStats> {
        let mut stats = vec![BandStats::default(); self.metadata.bands];
        for tile in self.tiles.values() {
            for (acc, band) in stats.iter_mut().zip(tile.bands()) {
                *acc += &band.iter().collect::<BandStats>();
            }
        }
        stats
    }

    /// Mosaic the tiles into one raster covering the key
    /// bounds. Cells without a tile are `NaN`. `None` for an
    /// empty layer.
    pub fn stitch(&self) -> Option<GeoRaster> {
        if self.tiles.is_empty() {
            return None;
        }
        let layout = &self.metadata.layout_definition;
        let bounds = &self.metadata.key_bounds;
        let (tile_cols, tile_rows) = layout.tile_dims();
        let (cols, rows) = (bounds.cols() * tile_cols, bounds.rows() * tile_rows);

        let mut bands = vec![Array2::from_elem((rows, cols), f64::NAN); self.metadata.bands];
        for (key, tile) in &self.tiles {
            let c0 = (key.col - bounds.min.col) * tile_cols;
            let r0 = (key.row - bounds.min.row) * tile_rows;
            for (out, band) in bands.iter_mut().zip(tile.bands()) {
                out.slice_mut(s![r0..r0 + tile_rows, c0..c0 + tile_cols])
                    .assign(band);
            }
        }

        let extent = layout.bounds_extent(bounds);
        let transform = GeoTransform::north_up((extent.xmin, extent.ymax), layout.cell_size());
        GeoRaster::new(bands, transform, self.metadata.crs.clone()).ok()
    }

    /// Levels of a tile pyramid from this layer's zoom down
    /// to `end_zoom`, finest first. Each level halves the
    /// resolution of the previous one by resampling blocks
    /// of 2x2 child tiles into their parent tile.
    ///
    /// Only layers on a power-of-two pyramid over the world
    /// extent of their CRS with square, power-of-two tiles
    /// can be pyramided; anything else is
    /// [`Error::UnsupportedPolicy`].
    pub fn pyramid(&self, end_zoom: u32, method: ResampleMethod) -> Result<Vec<TiledLayer>> {
        let meta = &self.metadata;
        let unsupported = |why: String| -> Result<Vec<TiledLayer>> {
            Err(Error::UnsupportedPolicy(format!("pyramid: {}", why)))
        };

        let world = match meta.crs.world_extent() {
            Some(w) => w,
            None => return unsupported(format!("{} has no world extent", meta.crs)),
        };
        if !zoomed::is_zoom_layout(&meta.layout_definition, &world, meta.zoom) {
            return unsupported(format!("layer is not on the zoom {} grid of {}", meta.zoom, meta.crs));
        }
        let (tile_cols, tile_rows) = meta.layout_definition.tile_dims();
        if tile_cols != tile_rows || !tile_cols.is_power_of_two() {
            return unsupported(format!("tiles of {}x{} cells are not a power of two", tile_cols, tile_rows));
        }
        if end_zoom > meta.zoom {
            return unsupported(format!("end zoom {} is above the layer zoom {}", end_zoom, meta.zoom));
        }

        let mut levels = Vec::with_capacity((meta.zoom - end_zoom) as usize + 1);
        levels.push(self.clone());
        for zoom in (end_zoom..meta.zoom).rev() {
            let next = levels[levels.len() - 1].coarsen(&world, zoom, method);
            tracing::debug!(zoom, tiles = next.len(), "built pyramid level");
            levels.push(next);
        }
        Ok(levels)
    }

    /// The layer one zoom level up, at `zoom`.
    fn coarsen(&self, world: &Extent, zoom: u32, method: ResampleMethod) -> TiledLayer {
        let meta = &self.metadata;
        let layout = zoomed::layout_for_zoom(world, zoom, meta.layout_definition.tile_layout.tile_cols);
        let parent = |k: &SpatialKey| SpatialKey::new(k.col / 2, k.row / 2);

        let parents: BTreeSet<SpatialKey> = self.tiles.keys().map(parent).collect();
        let parents: Vec<SpatialKey> = parents.into_iter().collect();
        let tiles: BTreeMap<_, _> = parents
            .par_iter()
            .filter_map(|&key| self.parent_tile(key, &layout, method).map(|t| (key, t)))
            .collect();

        let metadata = TileLayerMetadata {
            zoom,
            key_bounds: KeyBounds::new(parent(&meta.key_bounds.min), parent(&meta.key_bounds.max)),
            layout_definition: layout,
            ..meta.clone()
        };
        TiledLayer::new(metadata, tiles)
    }

    /// Resample the four children of `key` into one tile
    /// of the same size. `None` when no child holds data.
    fn parent_tile(&self, key: SpatialKey, layout: &LayoutDefinition, method: ResampleMethod) -> Option<MultibandTile> {
        let (tile_cols, tile_rows) = layout.tile_dims();
        let band_count = self.metadata.bands;

        let mut bands = vec![Array2::from_elem((2 * tile_rows, 2 * tile_cols), f64::NAN); band_count];
        let mut found = false;
        for dr in 0..2 {
            for dc in 0..2 {
                let child = SpatialKey::new(2 * key.col + dc, 2 * key.row + dr);
                if let Some(tile) = self.tiles.get(&child) {
                    found = true;
                    let (r0, c0) = (dr * tile_rows, dc * tile_cols);
                    for (out, band) in bands.iter_mut().zip(tile.bands()) {
                        out.slice_mut(s![r0..r0 + tile_rows, c0..c0 + tile_cols])
                            .assign(band);
                    }
                }
            }
        }
        if !found {
            return None;
        }

        let ext = layout.tile_extent(key);
        let transform = GeoTransform::north_up((ext.xmin, ext.ymax), self.metadata.layout_definition.cell_size());
        let children = GeoRaster::new(bands, transform, self.metadata.crs.clone()).ok()?;

        let mut tile = MultibandTile::empty(tile_cols, tile_rows, band_count);
        let mut values = vec![f64::NAN; band_count];
        for row in 0..tile_rows {
            for col in 0..tile_cols {
                let (c, r) = ((2 * col) as f64, (2 * row) as f64);
                let footprint: Bounds = Rect::new((c, r), (c + 2., r + 2.));
                method.sample(&children, (c + 1., r + 1.), &footprint, &mut values);
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
    use crate::crs::WEB_MERCATOR_MAX_COORD;
    use crate::geometry::CellSize;
    use crate::layout::TileLayout;

    fn layer() -> TiledLayer {
        let layout = LayoutDefinition::new(
            Extent::new(0., 0., 6., 4.),
            TileLayout {
                layout_cols: 3,
                layout_rows: 2,
                tile_cols: 2,
                tile_rows: 2,
            },
        );
        let summary = RasterSummary::new(
            Crs::lat_lng(),
            Extent::new(0., 0., 4., 4.),
            CellSize::new(1., 1.),
            16,
            1,
        );
        let metadata = TileLayerMetadata::new(0, layout, &summary).unwrap();

        let mut tiles = BTreeMap::new();
        tiles.insert(
            SpatialKey::new(0, 0),
            MultibandTile::new(vec![Array2::from_elem((2, 2), 1.)]).unwrap(),
        );
        let mut t = MultibandTile::new(vec![Array2::from_elem((2, 2), 5.)]).unwrap();
        t.band_mut(0)[(1, 1)] = f64::NAN;
        tiles.insert(SpatialKey::new(1, 1), t);
        TiledLayer::new(metadata, tiles)
    }

    #[test]
    fn metadata_bounds() {
        let l = layer();
        let kb = l.metadata().key_bounds;
        assert_eq!(kb, KeyBounds::new(SpatialKey::new(0, 0), SpatialKey::new(1, 1)));
        assert_eq!(l.len(), 2);
        assert_eq!(
            l.keys().cloned().collect::<Vec<_>>(),
            vec![SpatialKey::new(0, 0), SpatialKey::new(1, 1)]
        );
    }

    #[test]
    fn lookup() {
        let l = layer();
        assert!(l.lookup(0, 0).unwrap().is_some());
        assert!(l.lookup(1, 0).unwrap().is_none());
        match l.lookup(2, 0) {
            Err(Error::KeyOutOfBounds { key, .. }) => assert_eq!(key, SpatialKey::new(2, 0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn statistics() {
        let l = layer();
        assert_eq!(l.min_max(), Some((1., 5.)));
        let stats = l.band_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].count(), 7);
        assert_eq!(stats[0].mean(), Some((4. + 15.) / 7.));
    }

    #[test]
    fn stitch() {
        let r = layer().stitch().unwrap();
        assert_eq!(r.dims(), (4, 4));
        assert_eq!(r.extent(), Extent::new(0., 0., 4., 4.));
        let b = r.band(0);
        assert_eq!(b[(0, 0)], 1.);
        assert_eq!(b[(2, 2)], 5.);
        assert!(b[(3, 3)].is_nan());
        assert!(b[(0, 3)].is_nan());
    }

    #[test]
    fn metadata_json() {
        let m = layer().metadata().clone();
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("layoutDefinition").is_some());
        assert!(json.get("keyBounds").is_some());
        let back: TileLayerMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn metadata_outside_layout() {
        let layout = LayoutDefinition::new(
            Extent::new(0., 0., 2., 2.),
            TileLayout {
                layout_cols: 1,
                layout_rows: 1,
                tile_cols: 2,
                tile_rows: 2,
            },
        );
        let summary = RasterSummary::new(
            Crs::lat_lng(),
            Extent::new(10., 10., 12., 12.),
            CellSize::new(1., 1.),
            4,
            1,
        );
        assert!(matches!(
            TileLayerMetadata::new(0, layout, &summary),
            Err(Error::UnsupportedPolicy(_))
        ));
    }

    /// A web mercator layer at zoom 2 with 2x2 cell tiles.
    fn zoomed_layer(tile_res: usize) -> TiledLayer {
        let m = WEB_MERCATOR_MAX_COORD;
        let world = Extent::new(-m, -m, m, m);
        let metadata = TileLayerMetadata {
            zoom: 2,
            layout_definition: zoomed::layout_for_zoom(&world, 2, tile_res),
            crs: Crs::web_mercator(),
            extent: world,
            key_bounds: KeyBounds::new(SpatialKey::new(0, 0), SpatialKey::new(3, 3)),
            bands: 1,
        };
        let tile = |f: &dyn Fn(usize, usize) -> f64| {
            MultibandTile::new(vec![Array2::from_shape_fn((tile_res, tile_res), |(r, c)| f(r, c))]).unwrap()
        };

        let mut tiles = BTreeMap::new();
        tiles.insert(SpatialKey::new(0, 0), tile(&|_, _| 1.));
        tiles.insert(SpatialKey::new(1, 0), tile(&|_, _| 3.));
        tiles.insert(SpatialKey::new(3, 3), tile(&|r, c| if r == c { 4. } else { 8. }));
        TiledLayer::new(metadata, tiles)
    }

    #[test]
    fn pyramid_to_zoom_zero() {
        let layer = zoomed_layer(2);
        let levels = layer.pyramid(0, ResampleMethod::Average).unwrap();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0], layer);
        assert_eq!(
            levels.iter().map(|l| l.metadata().zoom).collect::<Vec<_>>(),
            vec![2, 1, 0]
        );

        let z1 = &levels[1];
        assert_eq!(z1.metadata().layout_definition.tile_layout.layout_cols, 2);
        assert_eq!(
            z1.metadata().key_bounds,
            KeyBounds::new(SpatialKey::new(0, 0), SpatialKey::new(1, 1))
        );
        assert_eq!(
            z1.keys().cloned().collect::<Vec<_>>(),
            vec![SpatialKey::new(0, 0), SpatialKey::new(1, 1)]
        );
        let nw = z1.get(&SpatialKey::new(0, 0)).unwrap().band(0);
        assert_eq!((nw[(0, 0)], nw[(0, 1)]), (1., 3.));
        assert!(nw[(1, 0)].is_nan() && nw[(1, 1)].is_nan());
        let se = z1.get(&SpatialKey::new(1, 1)).unwrap().band(0);
        assert_eq!(se[(1, 1)], 6.);
        assert!(se[(0, 0)].is_nan());

        let z0 = &levels[2];
        assert_eq!(z0.len(), 1);
        let m = WEB_MERCATOR_MAX_COORD;
        assert_eq!(z0.metadata().layout_definition.cell_size(), CellSize::new(m, m));
        let top = z0.lookup(0, 0).unwrap().unwrap().band(0);
        assert_eq!(top[(0, 0)], 2.);
        assert_eq!(top[(1, 1)], 6.);
        assert!(top[(0, 1)].is_nan() && top[(1, 0)].is_nan());
        assert_eq!(z0.metadata().extent, layer.metadata().extent);
    }

    #[test]
    fn pyramid_single_level() {
        let layer = zoomed_layer(4);
        let levels = layer.pyramid(2, ResampleMethod::NearestNeighbor).unwrap();
        assert_eq!(levels, vec![layer]);
    }

    #[test]
    fn pyramid_unsupported() {
        // Local grid.
        assert!(matches!(
            layer().pyramid(0, ResampleMethod::Average),
            Err(Error::UnsupportedPolicy(_))
        ));
        // Tiles of 3x3 cells.
        assert!(matches!(
            zoomed_layer(3).pyramid(0, ResampleMethod::Average),
            Err(Error::UnsupportedPolicy(_))
        ));
        // Deeper than the layer.
        assert!(matches!(
            zoomed_layer(2).pyramid(3, ResampleMethod::Average),
            Err(Error::UnsupportedPolicy(_))
        ));
    }
}
