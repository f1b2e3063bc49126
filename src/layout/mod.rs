//! Tile grids and the selection of a grid for a set of
//! rasters.
//!
//! A [`LayoutDefinition`] divides an extent into a regular
//! grid of `layout_cols x layout_rows` tiles, each of
//! `tile_cols x tile_rows` cells. Tiles are addressed by
//! [`SpatialKey`]; key `(0, 0)` is the top-left tile and
//! rows increase southward.
//!
//! Two schemes are supported, selected by
//! [`LayoutPolicy`]:
//!
//! - **Global** - a power-of-two pyramid over the world
//! extent of the CRS (see [`zoomed`]).
//!
//! - **Local** - a grid fitted to the data extent at the
//! native cell size (see [`floating`]).

use crate::error::{Error, Result};
use crate::geometry::{CellSize, Extent, GeoTransform, GRID_EPSILON};
use crate::summary::RasterSummary;
use serde_derive::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

pub mod floating;
pub mod zoomed;

/// Default tile width and height in cells.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Default tolerance when matching a cell size to a zoom
/// level.
pub const DEFAULT_RESOLUTION_THRESHOLD: f64 = 0.1;

/// Grid coordinate of a tile. Ordered row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpatialKey {
    pub col: usize,
    pub row: usize,
}

impl SpatialKey {
    pub fn new(col: usize, row: usize) -> Self {
        SpatialKey { col, row }
    }
}

impl Ord for SpatialKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.row, self.col).cmp(&(other.row, other.col))
    }
}
impl PartialOrd for SpatialKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// Inclusive range of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBounds {
    pub min: SpatialKey,
    pub max: SpatialKey,
}

impl KeyBounds {
    pub fn new(min: SpatialKey, max: SpatialKey) -> Self {
        debug_assert!(min.col <= max.col && min.row <= max.row);
        KeyBounds { min, max }
    }

    pub fn contains(&self, key: &SpatialKey) -> bool {
        (self.min.col..=self.max.col).contains(&key.col)
            && (self.min.row..=self.max.row).contains(&key.row)
    }

    pub fn union(&self, other: &KeyBounds) -> KeyBounds {
        KeyBounds {
            min: SpatialKey::new(self.min.col.min(other.min.col), self.min.row.min(other.min.row)),
            max: SpatialKey::new(self.max.col.max(other.max.col), self.max.row.max(other.max.row)),
        }
    }

    pub fn cols(&self) -> usize {
        self.max.col - self.min.col + 1
    }

    pub fn rows(&self) -> usize {
        self.max.row - self.min.row + 1
    }

    pub fn len(&self) -> usize {
        self.cols() * self.rows()
    }

    /// Keys in row-major order.
    pub fn keys(&self) -> impl Iterator<Item = SpatialKey> {
        let (min, max) = (self.min, self.max);
        (min.row..=max.row)
            .flat_map(move |row| (min.col..=max.col).map(move |col| SpatialKey::new(col, row)))
    }
}

impl fmt::Display for KeyBounds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// Dimensions of a tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayout {
    pub layout_cols: usize,
    pub layout_rows: usize,
    pub tile_cols: usize,
    pub tile_rows: usize,
}

/// A tile grid over an extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDefinition {
    pub extent: Extent,
    pub tile_layout: TileLayout,
}

impl LayoutDefinition {
    pub fn new(extent: Extent, tile_layout: TileLayout) -> Self {
        LayoutDefinition {
            extent,
            tile_layout,
        }
    }

    /// Top-left corner of the grid.
    pub fn origin(&self) -> (f64, f64) {
        (self.extent.xmin, self.extent.ymax)
    }

    pub fn tile_width(&self) -> f64 {
        self.extent.width() / self.tile_layout.layout_cols as f64
    }

    pub fn tile_height(&self) -> f64 {
        self.extent.height() / self.tile_layout.layout_rows as f64
    }

    pub fn cell_size(&self) -> CellSize {
        CellSize::new(
            self.tile_width() / self.tile_layout.tile_cols as f64,
            self.tile_height() / self.tile_layout.tile_rows as f64,
        )
    }

    pub fn tile_dims(&self) -> (usize, usize) {
        (self.tile_layout.tile_cols, self.tile_layout.tile_rows)
    }

    /// Every key of the grid.
    pub fn key_bounds(&self) -> KeyBounds {
        KeyBounds::new(
            SpatialKey::new(0, 0),
            SpatialKey::new(
                self.tile_layout.layout_cols - 1,
                self.tile_layout.layout_rows - 1,
            ),
        )
    }

    pub fn tile_extent(&self, key: SpatialKey) -> Extent {
        let (tw, th) = (self.tile_width(), self.tile_height());
        let (ox, oy) = self.origin();
        Extent::new(
            ox + key.col as f64 * tw,
            oy - (key.row + 1) as f64 * th,
            ox + (key.col + 1) as f64 * tw,
            oy - key.row as f64 * th,
        )
    }

    /// Geo transform of the cells of a tile.
    pub fn tile_transform(&self, key: SpatialKey) -> GeoTransform {
        let ext = self.tile_extent(key);
        GeoTransform::north_up((ext.xmin, ext.ymax), self.cell_size())
    }

    /// Keys of every tile that overlaps the extent with
    /// positive area. `None` if the extent misses the grid.
    pub fn key_bounds_for(&self, extent: &Extent) -> Option<KeyBounds> {
        let ext = self.extent.intersection(extent)?;
        let (tw, th) = (self.tile_width(), self.tile_height());
        let (ox, oy) = self.origin();
        let TileLayout {
            layout_cols,
            layout_rows,
            ..
        } = self.tile_layout;

        let first = |v: f64, max: usize| ((v + GRID_EPSILON).floor().max(0.) as usize).min(max - 1);
        let last = |v: f64, max: usize| {
            let v = (v - GRID_EPSILON).ceil().max(1.) as usize;
            (v - 1).min(max - 1)
        };

        let col_min = first((ext.xmin - ox) / tw, layout_cols);
        let col_max = last((ext.xmax - ox) / tw, layout_cols).max(col_min);
        let row_min = first((oy - ext.ymax) / th, layout_rows);
        let row_max = last((oy - ext.ymin) / th, layout_rows).max(row_min);

        Some(KeyBounds::new(
            SpatialKey::new(col_min, row_min),
            SpatialKey::new(col_max, row_max),
        ))
    }

    /// Extent covered by a range of keys.
    pub fn bounds_extent(&self, bounds: &KeyBounds) -> Extent {
        self.tile_extent(bounds.min)
            .union(&self.tile_extent(bounds.max))
    }
}

/// How to choose a tile grid for a set of rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutPolicy {
    /// Power-of-two pyramid over the world extent of the
    /// CRS. Without an explicit zoom, the zoom whose cell
    /// size best matches the data is used.
    Global {
        tile_size: usize,
        zoom: Option<u32>,
        resolution_threshold: f64,
    },
    /// Grid fitted to the data extent at its native cell
    /// size.
    Local { tile_cols: usize, tile_rows: usize },
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        LayoutPolicy::Local {
            tile_cols: DEFAULT_TILE_SIZE,
            tile_rows: DEFAULT_TILE_SIZE,
        }
    }
}

impl LayoutPolicy {
    pub fn global(tile_size: usize, zoom: Option<u32>) -> Self {
        LayoutPolicy::Global {
            tile_size,
            zoom,
            resolution_threshold: DEFAULT_RESOLUTION_THRESHOLD,
        }
    }

    pub fn local(tile_cols: usize, tile_rows: usize) -> Self {
        LayoutPolicy::Local {
            tile_cols,
            tile_rows,
        }
    }

    /// Build a policy from its name (`global` or `local`)
    /// and the parameters of both variants.
    pub fn named(
        name: &str,
        tile_cols: usize,
        tile_rows: usize,
        zoom: Option<u32>,
        resolution_threshold: f64,
    ) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "global" | "zoomed" => {
                if tile_cols != tile_rows {
                    return Err(Error::UnsupportedPolicy(format!(
                        "global layout needs square tiles, got {}x{}",
                        tile_cols, tile_rows
                    )));
                }
                Ok(LayoutPolicy::Global {
                    tile_size: tile_cols,
                    zoom,
                    resolution_threshold,
                })
            }
            "local" | "floating" => Ok(LayoutPolicy::local(tile_cols, tile_rows)),
            _ => Err(Error::UnsupportedPolicy(format!("unknown layout {:?}", name))),
        }
    }
}

impl fmt::Display for LayoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LayoutPolicy::Global {
                tile_size, zoom, ..
            } => match zoom {
                Some(z) => write!(f, "global({}, z={})", tile_size, z),
                None => write!(f, "global({})", tile_size),
            },
            LayoutPolicy::Local {
                tile_cols,
                tile_rows,
            } => write!(f, "local({}x{})", tile_cols, tile_rows),
        }
    }
}

/// Choose the tile grid for rasters described by
/// `summary`. Returns the zoom level (nominally `0` for
/// local layouts) and the grid.
pub fn select_layout(summary: &RasterSummary, policy: &LayoutPolicy) -> Result<(u32, LayoutDefinition)> {
    match *policy {
        LayoutPolicy::Global {
            tile_size,
            zoom,
            resolution_threshold,
        } => {
            if tile_size == 0 {
                return Err(Error::UnsupportedPolicy(format!("{}: zero tile size", policy)));
            }
            let world = summary.crs().world_extent().ok_or_else(|| {
                Error::UnsupportedPolicy(format!(
                    "{}: {} has no world extent",
                    policy,
                    summary.crs()
                ))
            })?;
            let zoom = match zoom {
                Some(z) if z > zoomed::MAX_ZOOM => {
                    return Err(Error::UnsupportedPolicy(format!(
                        "{}: zoom above {}",
                        policy,
                        zoomed::MAX_ZOOM
                    )))
                }
                Some(z) => z,
                None => zoomed::zoom_for_resolution(
                    &world,
                    tile_size,
                    summary.cell_size(),
                    resolution_threshold,
                ),
            };
            Ok((zoom, zoomed::layout_for_zoom(&world, zoom, tile_size)))
        }
        LayoutPolicy::Local {
            tile_cols,
            tile_rows,
        } => {
            if tile_cols == 0 || tile_rows == 0 {
                return Err(Error::UnsupportedPolicy(format!("{}: zero tile size", policy)));
            }
            let layout =
                floating::layout_for_extent(summary.extent(), summary.cell_size(), tile_cols, tile_rows);
            Ok((0, layout))
        }
    }
}
