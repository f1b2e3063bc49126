//! Grids fitted to the extent of the data.
//!
//! The grid is anchored at the top-left corner of the
//! extent and keeps the native cell size; partial tiles on
//! the right and bottom edges are padded so the grid may
//! extend past the data.

use super::{LayoutDefinition, TileLayout};
use crate::geometry::{CellSize, Extent};

pub fn layout_for_extent(
    extent: &Extent,
    cell: CellSize,
    tile_cols: usize,
    tile_rows: usize,
) -> LayoutDefinition {
    let (cols, rows) = cell.dims_for(extent);
    let layout_cols = (cols + tile_cols - 1) / tile_cols;
    let layout_rows = (rows + tile_rows - 1) / tile_rows;

    let tile_w = tile_cols as f64 * cell.width;
    let tile_h = tile_rows as f64 * cell.height;
    let grid = Extent::new(
        extent.xmin,
        extent.ymax - layout_rows as f64 * tile_h,
        extent.xmin + layout_cols as f64 * tile_w,
        extent.ymax,
    );

    LayoutDefinition::new(
        grid,
        TileLayout {
            layout_cols,
            layout_rows,
            tile_cols,
            tile_rows,
        },
    )
}
