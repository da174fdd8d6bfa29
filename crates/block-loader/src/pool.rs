//! Bounded pool of open source handles.
//!
//! Every iterator owns its own pool, so handles are never shared across
//! threads. The pool keeps at most `capacity` handles open and closes the
//! least recently used one when a new source is opened past that limit.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use raster_common::TimeKey;
use raster_io::{RasterBackend, RasterIoError};

use crate::registry::RasterSource;

/// Counters describing a pool's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Handles opened.
    pub opened: u64,
    /// Acquisitions served by an already open handle.
    pub reused: u64,
    /// Handles closed by eviction or release.
    pub closed: u64,
    /// Handles currently open.
    pub open: usize,
}

/// LRU pool of handles keyed by time key.
pub struct SourceHandlePool<B: RasterBackend> {
    backend: Arc<B>,
    handles: LruCache<TimeKey, B::Handle>,
    stats: PoolStats,
}

impl<B: RasterBackend> SourceHandlePool<B> {
    /// Create a pool holding at most `capacity` open handles (minimum 1).
    pub fn new(backend: Arc<B>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            backend,
            handles: LruCache::new(capacity),
            stats: PoolStats::default(),
        }
    }

    /// Handle for `source`, opening it if needed.
    pub fn acquire(&mut self, source: &RasterSource) -> Result<&mut B::Handle, RasterIoError> {
        let key = source.time_key();

        if self.handles.contains(&key) {
            self.stats.reused += 1;
        } else {
            let handle = self.backend.open(source.path())?;
            self.stats.opened += 1;
            tracing::trace!(time_key = %key, path = %source.path().display(), "Opened source handle");

            if let Some((evicted, _handle)) = self.handles.push(key, handle) {
                self.stats.closed += 1;
                tracing::trace!(time_key = %evicted, "Evicted source handle");
            }
        }

        self.handles.get_mut(&key).ok_or_else(|| {
            RasterIoError::open_failed(source.path(), "handle missing from pool after open")
        })
    }

    /// Close the handle for `time_key` if it is open.
    pub fn release(&mut self, time_key: &TimeKey) -> bool {
        let released = self.handles.pop(time_key).is_some();
        if released {
            self.stats.closed += 1;
            tracing::trace!(time_key = %time_key, "Released source handle");
        }
        released
    }

    /// Close every open handle.
    pub fn release_all(&mut self) {
        self.stats.closed += self.handles.len() as u64;
        self.handles.clear();
    }

    pub fn is_open(&self, time_key: &TimeKey) -> bool {
        self.handles.contains(time_key)
    }

    pub fn capacity(&self) -> usize {
        self.handles.cap().get()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            open: self.handles.len(),
            ..self.stats
        }
    }
}

impl<B: RasterBackend> Drop for SourceHandlePool<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}
