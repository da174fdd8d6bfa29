//! Raster backend and handle traits.

pub mod memory;
pub mod zarr;

use std::path::Path;

use crate::error::Result;
use crate::types::{PixelWindow, RasterMetadata, WarpRequest, WarpedRaster};
use crate::warp;

/// Trait for opening rasters of one storage format.
///
/// A backend is shared by every consumer of a raster collection, so it must
/// be `Send + Sync`. Each open raster is represented by a [`RasterHandle`].
pub trait RasterBackend: Send + Sync {
    /// Handle type for one open raster.
    type Handle: RasterHandle;

    /// File-name extension of rasters this backend reads (e.g. `"zarr"`).
    fn container_extension(&self) -> &'static str;

    /// Open the raster at `path`.
    fn open(&self, path: &Path) -> Result<Self::Handle>;

    /// Read only the metadata of the raster at `path`.
    fn read_metadata(&self, path: &Path) -> Result<RasterMetadata> {
        Ok(self.open(path)?.metadata().clone())
    }
}

/// One open raster.
///
/// Closing the underlying resource happens on `Drop`.
pub trait RasterHandle: Send {
    /// Path this handle was opened from.
    fn path(&self) -> &Path;

    /// Georeferencing and layout of the raster.
    fn metadata(&self) -> &RasterMetadata;

    /// Read a pixel window.
    ///
    /// Returns band-major values: `bands` consecutive row-major planes of
    /// `window.width * window.height` values each. Fails with
    /// [`RasterIoError::OutOfBounds`](crate::RasterIoError::OutOfBounds) if
    /// the window is not fully inside the raster.
    fn read_window(&mut self, window: &PixelWindow) -> Result<Vec<f32>>;

    /// Read `request.source_window` and resample it onto the destination
    /// grid described by the request.
    fn read_warped(&mut self, request: &WarpRequest) -> Result<WarpedRaster> {
        request.validate()?;
        let data = self.read_window(&request.source_window)?;
        warp::warp(self.metadata(), &data, request)
    }
}

/// Check a window lies inside a raster, producing the standard error if not.
pub(crate) fn check_window(
    path: &Path,
    metadata: &RasterMetadata,
    window: &PixelWindow,
) -> Result<()> {
    if window.is_empty() || !metadata.full_window().contains(window) {
        return Err(crate::RasterIoError::OutOfBounds {
            path: path.to_path_buf(),
            requested: window.to_string(),
            width: metadata.width,
            height: metadata.height,
        });
    }
    Ok(())
}
