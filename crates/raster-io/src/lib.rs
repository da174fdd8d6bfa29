//! Raster read and resample capability.
//!
//! This crate is the narrow I/O seam the block loader calls through:
//! "read and resample this pixel window of this raster into this grid".
//! The loader computes *where* every output pixel samples the source; this
//! crate decodes the bytes and does the sampling.
//!
//! # Architecture
//!
//! ```text
//! RasterBackend::open(path)
//!      │
//!      ▼
//! RasterHandle (one open raster)
//!      │
//!      ├─► metadata()      CRS, geotransform, size, bands, nodata
//!      │
//!      ├─► read_window()   band-major pixels of one source window
//!      │
//!      └─► read_warped()   read_window + per-pixel sampling
//!               │
//!               ▼
//!          WarpedRaster (pixel-interleaved values + valid mask)
//! ```
//!
//! Backends:
//!
//! - [`ZarrBackend`]: Zarr V3 arrays on the local filesystem.
//! - [`MemoryBackend`]: in-process rasters, used by tests and callers that
//!   already hold decoded data.

pub mod backend;
pub mod error;
pub mod interpolation;
pub mod types;
pub mod warp;

pub use backend::memory::{MemoryBackend, MemoryHandle, MemoryRaster};
pub use backend::zarr::{ZarrBackend, ZarrHandle};
pub use backend::{RasterBackend, RasterHandle};
pub use error::{RasterIoError, Result};
pub use types::{PixelWindow, RasterMetadata, ResamplingMethod, WarpRequest, WarpedRaster};
