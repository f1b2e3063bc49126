//! Reading and writing tiled layers on disk.
//!
//! A layer directory holds `metadata.json` (the layer
//! metadata) and one CBOR encoded tile per key at
//! `<col>/<row>.bin`.

use crate::{Result, Tracker};
use anyhow::Context;
use raster_layers::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.json";

pub fn write_bin<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let buf = std::io::BufWriter::with_capacity(0x100000, file);
    serde_cbor::to_writer(buf, data)?;
    Ok(())
}

pub fn read_bin<T: for<'a> serde::Deserialize<'a>>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let file = unsafe { memmap::MmapOptions::new().map(&file)? };
    Ok(serde_cbor::from_slice(file.as_ref())?)
}

pub fn write_json<T: Serialize>(path: &Path, json: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let buf = std::io::BufWriter::with_capacity(0x100000, file);
    Ok(serde_json::to_writer_pretty(buf, json)?)
}

pub fn read_json<T: for<'a> serde::Deserialize<'a>>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

/// Path of the tile at `key` under the layer directory.
pub fn tile_path(base: &Path, key: &SpatialKey) -> PathBuf {
    base.join(key.col.to_string()).join(format!("{}.bin", key.row))
}

/// Tiles and bytes written by [`write_layer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub tiles: usize,
    pub bytes: u64,
}

/// Write a layer into the directory `base`, creating it if
/// needed. Tiles are written in parallel.
pub fn write_layer(base: &Path, layer: &TiledLayer) -> Result<WriteSummary> {
    std::fs::create_dir_all(base).with_context(|| format!("creating {}", base.display()))?;
    write_json(&base.join(METADATA_FILE), layer.metadata())?;

    use rayon::prelude::*;
    let tiles: Vec<_> = layer.tiles().collect();
    let tracker = Tracker::new("tiles", tiles.len());
    tiles.par_iter().try_for_each(|(key, tile)| -> Result<()> {
        let path = tile_path(base, key);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        write_bin(&path, tile)?;
        let bytes = std::fs::metadata(&path)?.len();
        tracker.increment(bytes);
        Ok(())
    })?;

    Ok(WriteSummary {
        tiles: tracker.written(),
        bytes: tracker.bytes(),
    })
}

/// Read a layer written by [`write_layer`]. Keys within the
/// key bounds without a tile file are absent.
pub fn read_layer(base: &Path) -> Result<TiledLayer> {
    let metadata: TileLayerMetadata = read_json(&base.join(METADATA_FILE))?;

    let mut tiles = BTreeMap::new();
    for key in metadata.key_bounds.keys() {
        let path = tile_path(base, &key);
        if path.exists() {
            let tile: MultibandTile = read_bin(&path)?;
            tiles.insert(key, tile);
        }
    }
    Ok(TiledLayer::new(metadata, tiles))
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::Array2;
    use rand::*;
    use tempdir::TempDir;

    const TILE: usize = 16;

    fn random_tile<R: Rng>(rng: &mut R) -> MultibandTile {
        let mut band = Array2::from_shape_fn((TILE, TILE), |_| rng.gen::<f64>());
        band[(0, 0)] = f64::NAN;
        MultibandTile::new(vec![band]).unwrap()
    }

    fn layer() -> TiledLayer {
        let layout = LayoutDefinition::new(
            Extent::new(0., 0., 64., 32.),
            TileLayout {
                layout_cols: 4,
                layout_rows: 2,
                tile_cols: TILE,
                tile_rows: TILE,
            },
        );
        let summary = RasterSummary::new(
            Crs::web_mercator(),
            Extent::new(0., 0., 64., 32.),
            CellSize::new(1., 1.),
            64 * 32,
            1,
        );
        let metadata = TileLayerMetadata::new(0, layout, &summary).unwrap();

        let mut rng = thread_rng();
        let tiles = [(0, 0), (3, 0), (1, 1)]
            .iter()
            .map(|&(c, r)| (SpatialKey::new(c, r), random_tile(&mut rng)))
            .collect();
        TiledLayer::new(metadata, tiles)
    }

    #[test]
    fn write_read_layer() -> Result<()> {
        let tmp_dir = TempDir::new("raster_tools_test")?;
        let base = tmp_dir.path().join("layer");
        let layer = layer();

        let summary = write_layer(&base, &layer)?;
        assert_eq!(summary.tiles, 3);
        assert!(summary.bytes > 0);
        assert!(base.join(METADATA_FILE).exists());
        assert!(base.join("3").join("0.bin").exists());
        assert!(!base.join("2").join("0.bin").exists());

        let back = read_layer(&base)?;
        assert_eq!(back, layer);
        Ok(())
    }

    #[test]
    fn read_missing_layer() {
        let tmp_dir = TempDir::new("raster_tools_test").unwrap();
        assert!(read_layer(tmp_dir.path()).is_err());
    }
}
