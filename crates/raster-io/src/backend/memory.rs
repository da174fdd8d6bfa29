//! In-process raster backend.
//!
//! Rasters are registered against filesystem paths and served from memory.
//! The backend counts opens and live handles so callers can observe handle
//! lifetimes, and individual paths can be marked to fail on read.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::{check_window, RasterBackend, RasterHandle};
use crate::error::{RasterIoError, Result};
use crate::types::{PixelWindow, RasterMetadata};

/// A decoded raster held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRaster {
    pub metadata: RasterMetadata,
    /// Band-major values: `bands` row-major planes of `width * height`.
    pub data: Vec<f32>,
}

impl MemoryRaster {
    /// Create a raster, checking `data` matches the declared layout.
    pub fn new(metadata: RasterMetadata, data: Vec<f32>) -> Result<Self> {
        let expected = metadata.width * metadata.height * metadata.bands;
        if data.len() != expected {
            return Err(RasterIoError::InvalidRequest(format!(
                "raster data holds {} values, expected {}",
                data.len(),
                expected
            )));
        }
        Ok(Self { metadata, data })
    }
}

#[derive(Debug, Default)]
struct Shared {
    rasters: RwLock<HashMap<PathBuf, Arc<MemoryRaster>>>,
    failing_reads: RwLock<HashSet<PathBuf>>,
    opened: AtomicUsize,
    live: AtomicUsize,
}

/// Backend serving [`MemoryRaster`]s keyed by path.
///
/// Clones share the same store and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<Shared>,
}

fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raster at `path`, replacing any previous one.
    pub fn insert(&self, path: impl AsRef<Path>, raster: MemoryRaster) {
        let path = normalize(path.as_ref());
        self.shared
            .rasters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path, Arc::new(raster));
    }

    /// Make every window read of `path` fail.
    pub fn fail_reads(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.shared
            .failing_reads
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path);
    }

    /// Total number of successful opens.
    pub fn open_count(&self) -> usize {
        self.shared.opened.load(Ordering::SeqCst)
    }

    /// Number of handles currently alive.
    pub fn live_handles(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }
}

impl RasterBackend for MemoryBackend {
    type Handle = MemoryHandle;

    fn container_extension(&self) -> &'static str {
        "zarr"
    }

    fn open(&self, path: &Path) -> Result<MemoryHandle> {
        let key = normalize(path);
        let raster = self
            .shared
            .rasters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
            .ok_or_else(|| RasterIoError::open_failed(path, "no raster registered at path"))?;

        self.shared.opened.fetch_add(1, Ordering::SeqCst);
        self.shared.live.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryHandle {
            path: key,
            raster,
            shared: Arc::clone(&self.shared),
        })
    }
}

/// An open in-memory raster.
#[derive(Debug)]
pub struct MemoryHandle {
    path: PathBuf,
    raster: Arc<MemoryRaster>,
    shared: Arc<Shared>,
}

impl RasterHandle for MemoryHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &RasterMetadata {
        &self.raster.metadata
    }

    fn read_window(&mut self, window: &PixelWindow) -> Result<Vec<f32>> {
        if self
            .shared
            .failing_reads
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&self.path)
        {
            return Err(RasterIoError::read_failed(&self.path, "simulated read failure"));
        }

        let meta = &self.raster.metadata;
        check_window(&self.path, meta, window)?;

        let plane = meta.width * meta.height;
        let mut out = Vec::with_capacity(window.len() * meta.bands);
        for band in 0..meta.bands {
            let band_data = &self.raster.data[band * plane..(band + 1) * plane];
            for row in window.row_off..window.row_end() {
                let start = row * meta.width + window.col_off;
                out.extend_from_slice(&band_data[start..start + window.width]);
            }
        }
        Ok(out)
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        self.shared.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::{Crs, GeoTransform};

    fn raster(width: usize, height: usize, bands: usize) -> MemoryRaster {
        let metadata = RasterMetadata {
            crs: Crs::new("EPSG:4326"),
            transform: GeoTransform::from_origin(0.0, height as f64, 1.0, 1.0),
            width,
            height,
            bands,
            nodata: None,
        };
        let data = (0..width * height * bands).map(|i| i as f32).collect();
        MemoryRaster::new(metadata, data).unwrap()
    }

    #[test]
    fn test_read_window_band_major() {
        let backend = MemoryBackend::new();
        backend.insert("/virtual/a", raster(3, 2, 2));
        let mut handle = backend.open(Path::new("/virtual/a")).unwrap();
        let data = handle.read_window(&PixelWindow::new(1, 0, 2, 2)).unwrap();
        // band 0 plane = 0..6, band 1 plane = 6..12
        assert_eq!(data, vec![1.0, 2.0, 4.0, 5.0, 7.0, 8.0, 10.0, 11.0]);
    }

    #[test]
    fn test_out_of_bounds_window() {
        let backend = MemoryBackend::new();
        backend.insert("/virtual/a", raster(3, 2, 1));
        let mut handle = backend.open(Path::new("/virtual/a")).unwrap();
        let err = handle.read_window(&PixelWindow::new(2, 0, 2, 1)).unwrap_err();
        assert!(matches!(err, RasterIoError::OutOfBounds { .. }));
    }

    #[test]
    fn test_handle_counting() {
        let backend = MemoryBackend::new();
        backend.insert("/virtual/a", raster(1, 1, 1));
        let h1 = backend.open(Path::new("/virtual/a")).unwrap();
        let h2 = backend.open(Path::new("/virtual/a")).unwrap();
        assert_eq!(backend.open_count(), 2);
        assert_eq!(backend.live_handles(), 2);
        drop(h1);
        assert_eq!(backend.live_handles(), 1);
        drop(h2);
        assert_eq!(backend.live_handles(), 0);
        assert_eq!(backend.open_count(), 2);
    }

    #[test]
    fn test_open_unknown_and_failing_reads() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.open(Path::new("/virtual/missing")),
            Err(RasterIoError::OpenFailed { .. })
        ));

        backend.insert("/virtual/b", raster(2, 2, 1));
        backend.fail_reads("/virtual/b");
        let mut handle = backend.open(Path::new("/virtual/b")).unwrap();
        assert!(matches!(
            handle.read_window(&PixelWindow::new(0, 0, 1, 1)),
            Err(RasterIoError::ReadFailed { .. })
        ));
        assert_eq!(backend.read_metadata(Path::new("/virtual/b")).unwrap().width, 2);
    }

    #[test]
    fn test_raster_length_checked() {
        let r = raster(2, 2, 1);
        assert!(MemoryRaster::new(r.metadata, vec![0.0; 3]).is_err());
    }
}
