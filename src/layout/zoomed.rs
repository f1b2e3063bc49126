//! Power-of-two tile pyramids over the world extent of a
//! CRS.
//!
//! At zoom `z` the world is split into `2^z x 2^z` tiles
//! of `tile_size x tile_size` cells.

use super::{LayoutDefinition, TileLayout};
use crate::geometry::{CellSize, Extent, GRID_EPSILON};

/// Deepest supported zoom level.
pub const MAX_ZOOM: u32 = 30;

/// Number of tiles along each axis at a zoom level.
#[inline]
pub fn tiles_at(zoom: u32) -> usize {
    1 << zoom
}

/// Size of a tile in world units at a zoom level.
pub fn tile_size(world: &Extent, zoom: u32) -> (f64, f64) {
    let n = tiles_at(zoom) as f64;
    (world.width() / n, world.height() / n)
}

/// Size of a cell in world units at a zoom level.
pub fn cell_size(world: &Extent, zoom: u32, tile_res: usize) -> CellSize {
    let (tw, th) = tile_size(world, zoom);
    CellSize::new(tw / tile_res as f64, th / tile_res as f64)
}

/// Zoom whose cell size best matches `reference`.
///
/// Starts from the deepest zoom whose cells are still at
/// least as wide as the reference, and moves one level
/// deeper when the reference lies more than `threshold` of
/// the way from that zoom's cell width to the next one's.
/// Capped at [`MAX_ZOOM`].
pub fn zoom_for_resolution(world: &Extent, tile_res: usize, reference: CellSize, threshold: f64) -> u32 {
    let res = |z: u32| cell_size(world, z, tile_res).width;
    let target = reference.width;

    let zoom = match (0..=MAX_ZOOM).take_while(|&z| res(z) >= target).last() {
        Some(z) => z,
        None => return 0,
    };
    if zoom == MAX_ZOOM {
        return MAX_ZOOM;
    }

    let ratio = (res(zoom) - target) / (res(zoom) - res(zoom + 1));
    if ratio > threshold {
        zoom + 1
    } else {
        zoom
    }
}

/// Whether `layout` is the pyramid level `zoom` over
/// `world`.
pub fn is_zoom_layout(layout: &LayoutDefinition, world: &Extent, zoom: u32) -> bool {
    let n = tiles_at(zoom);
    let tl = &layout.tile_layout;
    let eps = GRID_EPSILON * world.width().max(world.height());
    tl.layout_cols == n
        && tl.layout_rows == n
        && (layout.extent.xmin - world.xmin).abs() <= eps
        && (layout.extent.ymin - world.ymin).abs() <= eps
        && (layout.extent.xmax - world.xmax).abs() <= eps
        && (layout.extent.ymax - world.ymax).abs() <= eps
}

/// The layout of the pyramid at a zoom level.
pub fn layout_for_zoom(world: &Extent, zoom: u32, tile_res: usize) -> LayoutDefinition {
    let n = tiles_at(zoom);
    LayoutDefinition::new(
        *world,
        TileLayout {
            layout_cols: n,
            layout_rows: n,
            tile_cols: tile_res,
            tile_rows: tile_res,
        },
    )
}
