//! Common types shared across the raster block loader workspace.

pub mod bbox;
pub mod crs;
pub mod geotransform;
pub mod time;

pub use bbox::BoundingBox;
pub use crs::{Crs, CrsCode, CrsParseError};
pub use geotransform::GeoTransform;
pub use time::{TimeExtractionRule, TimeKey, TimeParseError};
