//! Ingest geo-referenced rasters into spatially keyed,
//! tiled layers.
//!
//! The entry point is [`read_to_layout`]: given raster
//! file paths and [`IngestOptions`], it decodes every
//! source, optionally reprojects them into a target CRS,
//! picks a tile grid according to a [`LayoutPolicy`], and
//! retiles every source onto it. The result is a
//! [`TiledLayer`]: a map from [`SpatialKey`] to
//! [`MultibandTile`] with [`TileLayerMetadata`].
//!
//! # Backends
//!
//! GeoTIFF files are decoded in pure Rust. Enable the
//! `gdal` feature to read any format GDAL supports through
//! [`Backend::Gdal`].
//!
//! # Layouts
//!
//! - [`LayoutPolicy::Global`] tiles the world extent of the
//! CRS as a power-of-two pyramid (web mercator and
//! geographic CRSs only).
//!
//! - [`LayoutPolicy::Local`] fits a grid to the data at its
//! native cell size.

pub mod crs;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod layout;
pub mod pipeline;
pub mod raster;
pub mod reproject;
pub mod resample;
pub mod source;
pub mod stats;
pub mod summary;
pub mod tile;
pub mod tile_source;

pub mod prelude;

pub use crate::error::{Error, Result};
pub use crate::layer::{TileLayerMetadata, TiledLayer};
pub use crate::layout::{select_layout, KeyBounds, LayoutDefinition, LayoutPolicy, SpatialKey};
pub use crate::pipeline::{read_to_layout, read_to_layout_with, IngestOptions};
pub use crate::source::{Backend, RasterCodec, RasterSource};
pub use crate::tile::MultibandTile;
