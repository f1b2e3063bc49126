//! Error taxonomy of the ingestion pipeline.
//!
//! Collaborators (codecs, CRS transforms) report failures
//! as [`anyhow::Error`] with context attached. The pipeline
//! wraps them into the typed variants below so callers can
//! tell which stage failed.

use crate::layout::{KeyBounds, SpatialKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No source paths were given.
    #[error("no raster sources given")]
    EmptyInput,

    /// The selected backend could not decode a source.
    #[error("reading raster source {path}")]
    SourceRead {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// The target CRS string could not be parsed.
    #[error("invalid CRS: {0:?}")]
    InvalidCrs(String),

    /// The layout selector cannot realise the policy.
    #[error("unsupported layout policy: {0}")]
    UnsupportedPolicy(String),

    #[error("reprojecting raster source {path}")]
    Reproject {
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// Sources disagree on CRS and no target CRS was given.
    #[error("mixed CRS in raster summary: expected {expected}, found {found}")]
    MixedCrs { expected: String, found: String },

    #[error("raster backend {0} is not compiled in")]
    BackendUnavailable(&'static str),

    #[error("key {key} is outside layer bounds {bounds}")]
    KeyOutOfBounds { key: SpatialKey, bounds: KeyBounds },
}

pub type Result<T> = std::result::Result<T, Error>;
