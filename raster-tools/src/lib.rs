//! Command line front-end of `raster-layers`: argument
//! parsing helpers, progress reporting and on-disk layer
//! storage.

pub mod utils;

pub mod proc;
pub use proc::*;

pub mod cli;

pub type Result<T> = anyhow::Result<T>;
