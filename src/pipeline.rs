//! Ingestion of raster files into a tiled layer.
//!
//! The pipeline opens every source, optionally reprojects
//! them into a common CRS, summarises them, selects a tile
//! grid, binds every source to the grid, summarises again
//! against the grid, and finally reads and merges the tiles
//! of every source into one [`TiledLayer`].
//!
//! Work on independent sources (and on the keys of one
//! source) runs on the `rayon` pool. Each parallel phase
//! keeps the input order and stops at the first failure.
//! When sources overlap, tiles of later sources replace
//! those of earlier ones.

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::layer::{TileLayerMetadata, TiledLayer};
use crate::layout::{select_layout, LayoutPolicy, SpatialKey};
use crate::resample::ResampleMethod;
use crate::source::{Backend, RasterCodec, RasterSource};
use crate::summary::RasterSummary;
use crate::tile::MultibandTile;
use crate::tile_source::LayoutTileSource;
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Options of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    pub policy: LayoutPolicy,
    /// CRS to reproject every source into, as `EPSG:<code>`,
    /// a bare code or a PROJ.4 string.
    pub target_crs: Option<String>,
    pub resample: ResampleMethod,
    pub backend: Backend,
}

/// Ingest the rasters at `paths` with the codec of
/// `options.backend`.
pub fn read_to_layout<P>(paths: &[P], options: &IngestOptions) -> Result<TiledLayer>
where
    P: AsRef<str> + Sync,
{
    let target = parse_target(options.target_crs.as_deref())?;
    let codec = options.backend.codec()?;
    ingest(
        codec.as_ref(),
        paths,
        &options.policy,
        target.as_ref(),
        options.resample,
    )
}

/// Ingest the rasters at `paths` with a caller supplied
/// codec.
pub fn read_to_layout_with<P>(
    codec: &dyn RasterCodec,
    paths: &[P],
    policy: &LayoutPolicy,
    target_crs: Option<&str>,
    resample: ResampleMethod,
) -> Result<TiledLayer>
where
    P: AsRef<str> + Sync,
{
    let target = parse_target(target_crs)?;
    ingest(codec, paths, policy, target.as_ref(), resample)
}

fn parse_target(raw: Option<&str>) -> Result<Option<Crs>> {
    raw.map(Crs::parse).transpose()
}

fn ingest<P>(
    codec: &dyn RasterCodec,
    paths: &[P],
    policy: &LayoutPolicy,
    target: Option<&Crs>,
    resample: ResampleMethod,
) -> Result<TiledLayer>
where
    P: AsRef<str> + Sync,
{
    if paths.is_empty() {
        return Err(Error::EmptyInput);
    }
    info!(sources = paths.len(), %policy, "ingesting rasters");

    let sources = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            codec.open(path).map_err(|source| Error::SourceRead {
                path: path.into(),
                source,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let sources = match target {
        Some(crs) => {
            debug!(%crs, "reprojecting sources");
            reproject_all(&sources, crs, resample)?
        }
        None => sources,
    };

    let summary = RasterSummary::from_sources(&sources)?;
    debug!(
        crs = %summary.crs(),
        extent = ?summary.extent(),
        cell_size = ?summary.cell_size(),
        cells = summary.cells(),
        "summarised sources"
    );

    let (zoom, layout) = select_layout(&summary, policy)?;
    debug!(zoom, layout = ?layout.tile_layout, "selected layout");

    let bound: Vec<LayoutTileSource> = sources
        .par_iter()
        .map(|src| src.tile_to_layout(&layout, resample))
        .collect();
    drop(sources);

    let summary = RasterSummary::from_layout_sources(&bound)?;
    let metadata = TileLayerMetadata::new(zoom, layout, &summary)?;
    debug!(key_bounds = %metadata.key_bounds, "tiling sources");

    let per_source: Vec<Vec<(SpatialKey, MultibandTile)>> = bound
        .par_iter()
        .map(|src| {
            src.keys()
                .into_par_iter()
                .filter_map(|key| src.read(key).map(|tile| (key, tile)))
                .collect()
        })
        .collect();
    drop(bound);

    let mut tiles = BTreeMap::new();
    let mut overwritten = 0usize;
    for (key, tile) in per_source.into_iter().flatten() {
        if tiles.insert(key, tile).is_some() {
            overwritten += 1;
        }
    }
    debug!(overwritten, "merged tiles");
    info!(zoom, tiles = tiles.len(), "ingested layer");

    Ok(TiledLayer::new(metadata, tiles))
}

fn reproject_all(sources: &[RasterSource], target: &Crs, resample: ResampleMethod) -> Result<Vec<RasterSource>> {
    sources
        .par_iter()
        .map(|src| {
            src.reproject(target, resample)
                .map_err(|source| Error::Reproject {
                    path: src.name().into(),
                    source,
                })
        })
        .collect()
}
