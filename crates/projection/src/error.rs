//! Error types for projection setup.

use raster_common::CrsParseError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// The CRS is not one the projection layer can transform.
    #[error("unsupported CRS: {0}")]
    UnsupportedCrs(String),

    /// Projection parameters are out of range.
    #[error("invalid projection parameters: {0}")]
    InvalidParameters(String),
}

impl From<CrsParseError> for ProjectionError {
    fn from(err: CrsParseError) -> Self {
        match err {
            CrsParseError::UnsupportedCrs(s) => Self::UnsupportedCrs(s),
        }
    }
}
