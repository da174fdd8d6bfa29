//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.
//! Every projection maps between geographic lon/lat degrees and its own
//! coordinate space; [`CrsTransform`] chains two of them through lon/lat.

pub mod error;
pub mod geographic;
pub mod mercator;
pub mod transform;
pub mod transverse_mercator;

pub use error::ProjectionError;
pub use geographic::Geographic;
pub use mercator::WebMercator;
pub use transform::{CrsTransform, Projection};
pub use transverse_mercator::TransverseMercator;

/// WGS84 semi-major axis (meters)
pub const WGS84_SEMI_MAJOR: f64 = 6378137.0;

/// WGS84 inverse flattening
pub const WGS84_INVERSE_FLATTENING: f64 = 298.257223563;
