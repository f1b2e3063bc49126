pub use crate::{Error, Result};

pub use crate::crs::*;
pub use crate::geometry::*;
pub use crate::layer::*;
pub use crate::layout::*;
pub use crate::pipeline::*;
pub use crate::raster::*;
pub use crate::resample::*;
pub use crate::source::*;
pub use crate::stats::*;
pub use crate::summary::*;
pub use crate::tile::*;
pub use crate::tile_source::*;
