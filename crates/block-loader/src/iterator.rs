//! Lazy iteration over every block of an initialized session.

use std::iter::FusedIterator;
use std::sync::Arc;

use raster_io::RasterBackend;

use crate::block::Block;
use crate::error::BlockError;
use crate::pool::{PoolStats, SourceHandlePool};
use crate::session::PreparedSession;

/// Iterator over `Result<Block, BlockError>`, ordered by time key and then
/// row-major lattice position.
///
/// Blocks are read on demand; nothing is cached between pulls. The iterator
/// owns its handle pool: a source's handle is closed after its last block,
/// and every handle is closed when iteration ends, when [`close`] is called
/// or when the iterator is dropped.
///
/// [`close`]: BlockIter::close
pub struct BlockIter<B: RasterBackend> {
    prepared: Arc<PreparedSession>,
    pool: SourceHandlePool<B>,
    next: usize,
    total: usize,
    done: bool,
}

impl<B: RasterBackend> BlockIter<B> {
    pub(crate) fn new(prepared: Arc<PreparedSession>, backend: Arc<B>) -> Self {
        let pool = SourceHandlePool::new(backend, prepared.config.max_open_handles);
        let total = prepared.total_blocks();
        Self {
            prepared,
            pool,
            next: 0,
            total,
            done: total == 0,
        }
    }

    /// Stop iterating and close every open handle.
    pub fn close(&mut self) {
        if !self.done {
            tracing::debug!(position = self.next, total = self.total, "Block iteration closed");
        }
        self.finish();
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Blocks yielded so far.
    pub fn position(&self) -> usize {
        self.next
    }

    fn finish(&mut self) {
        self.done = true;
        self.pool.release_all();
    }
}

impl<B: RasterBackend> Iterator for BlockIter<B> {
    type Item = Result<Block, BlockError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let prepared = Arc::clone(&self.prepared);
        let per_step = prepared.indexer.len();
        let index = self.next;
        self.next += 1;

        let entry = &prepared.entries[index / per_step];
        let coordinate = prepared.indexer.coordinate_at(index % per_step)?;
        let rect = prepared.indexer.pixel_rect_for(coordinate)?;

        let result = prepared.load_block(entry, coordinate, &rect, &mut self.pool);

        if index % per_step == per_step - 1 {
            self.pool.release(&entry.source.time_key());
        }

        match &result {
            Err(e) if prepared.config.strict => {
                tracing::warn!(error = %e, "Block read failed; stopping iteration");
                self.finish();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Block read failed; continuing");
            }
            Ok(_) => {}
        }

        if self.next >= self.total {
            self.finish();
        }

        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.done { 0 } else { self.total - self.next };
        (remaining, Some(remaining))
    }
}

impl<B: RasterBackend> ExactSizeIterator for BlockIter<B> {}

impl<B: RasterBackend> FusedIterator for BlockIter<B> {}

#[cfg(test)]
mod tests {
    use crate::session::BlockLoader;
    use crate::types::{BlockCoordinate, BlockSpec, ReferenceGrid};
    use raster_common::{Crs, GeoTransform, TimeKey};
    use raster_io::{MemoryBackend, MemoryRaster, RasterMetadata};
    use test_utils::temp_dir_with_entries;

    fn setup() -> (tempfile::TempDir, BlockLoader<MemoryBackend>) {
        let dir = temp_dir_with_entries(&["a.zarr", "b.zarr"]);
        let backend = MemoryBackend::new();
        let grid = ReferenceGrid::new(
            Crs::new("EPSG:4326"),
            GeoTransform::from_origin(0.0, 6.0, 1.0, 1.0),
            6,
            6,
        );
        for name in ["a.zarr", "b.zarr"] {
            let meta = RasterMetadata {
                crs: grid.crs.clone(),
                transform: grid.transform,
                width: 6,
                height: 6,
                bands: 1,
                nodata: None,
            };
            backend.insert(dir.path().join(name), MemoryRaster::new(meta, vec![0.5; 36]).unwrap());
        }
        let mut loader = BlockLoader::new(backend, BlockSpec::square(4).unwrap());
        loader
            .add_source(TimeKey::from_ymd(2024, 1, 1).unwrap(), dir.path().join("a.zarr"))
            .unwrap();
        loader
            .add_source(TimeKey::from_ymd(2024, 1, 2).unwrap(), dir.path().join("b.zarr"))
            .unwrap();
        loader.set_reference_explicit(grid).unwrap();
        loader.init().unwrap();
        (dir, loader)
    }

    #[test]
    fn test_size_hint_is_exact() {
        let (_dir, loader) = setup();
        let mut iter = loader.blocks().unwrap();
        assert_eq!(iter.len(), 8);
        iter.next();
        iter.next();
        assert_eq!(iter.size_hint(), (6, Some(6)));
        assert_eq!(iter.position(), 2);
        assert_eq!(iter.by_ref().count(), 6);
        assert_eq!(iter.len(), 0);
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_edge_blocks_are_padded() {
        let (_dir, loader) = setup();
        let last = loader.blocks().unwrap().last().unwrap().unwrap();
        assert_eq!(last.coordinate(), BlockCoordinate::new(1, 1));
        assert_eq!((last.width(), last.height()), (4, 4));
        assert_eq!(last.valid_pixel_count(), 4);
        assert_eq!(last.pixel(1, 1, 0), Some(0.5));
        assert!(last.pixel(2, 0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_handle_released_after_each_source() {
        let (_dir, loader) = setup();
        let mut iter = loader.blocks().unwrap();
        for _ in 0..3 {
            iter.next();
        }
        assert_eq!(iter.pool_stats().open, 1);
        iter.next();
        assert_eq!(iter.pool_stats().open, 0);
        assert_eq!(iter.pool_stats().opened, 1);
        assert_eq!(iter.pool_stats().reused, 3);

        iter.next();
        assert_eq!(loader.backend().live_handles(), 1);
        iter.close();
        assert_eq!(loader.backend().live_handles(), 0);
        assert!(iter.next().is_none());
    }
}
