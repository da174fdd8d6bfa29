//! Error types for raster I/O.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while opening or reading rasters.
#[derive(Error, Debug)]
pub enum RasterIoError {
    /// Failed to open the raster.
    #[error("failed to open raster {path}: {message}")]
    OpenFailed { path: PathBuf, message: String },

    /// Failed to read pixel data.
    #[error("failed to read raster {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    /// The requested window is outside the raster.
    #[error("window {requested} is outside raster {path} ({width}x{height})")]
    OutOfBounds {
        path: PathBuf,
        requested: String,
        width: usize,
        height: usize,
    },

    /// Invalid or missing georeferencing metadata.
    #[error("invalid raster metadata for {path}: {message}")]
    InvalidMetadata { path: PathBuf, message: String },

    /// Malformed warp request.
    #[error("invalid warp request: {0}")]
    InvalidRequest(String),
}

impl RasterIoError {
    /// Create an OpenFailed error.
    pub fn open_failed(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a ReadFailed error.
    pub fn read_failed(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            path: path.into(),
            message: msg.into(),
        }
    }
}

/// Result type for raster I/O operations.
pub type Result<T> = std::result::Result<T, RasterIoError>;
