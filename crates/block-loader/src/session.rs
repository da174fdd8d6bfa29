//! Block loading session and its lifecycle.
//!
//! ```text
//! Unconfigured ──add_source──► FilesLoaded ──set_reference──► ReferenceSet
//!                                                                 │
//!                                   any mutation ◄── Initialized ◄┘ init()
//! ```
//!
//! `init()` freezes the registry and reference into an immutable
//! [`PreparedSession`] shared by every iterator through an `Arc`. Mutating
//! the loader drops its own reference to the snapshot; live iterators keep
//! theirs and are unaffected.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use raster_common::{TimeExtractionRule, TimeKey};
use raster_io::{PixelWindow, RasterBackend, RasterHandle};
use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::config::LoaderConfig;
use crate::error::{BlockError, LoaderError, Result};
use crate::indexer::BlockIndexer;
use crate::iterator::BlockIter;
use crate::planner::{build_plan, AlignmentPlan, WindowResolution};
use crate::pool::SourceHandlePool;
use crate::reference::{derive_reference, reference_from_source};
use crate::registry::{DirectoryScan, RasterSource, SourceRegistry};
use crate::types::{BlockCoordinate, BlockSpec, ReferenceGrid};

/// Observable lifecycle state of a [`BlockLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No sources registered.
    Unconfigured,
    /// Sources registered, no reference grid.
    FilesLoaded,
    /// Sources and a reference grid, not yet initialized.
    ReferenceSet,
    /// Ready to produce blocks.
    Initialized,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::FilesLoaded => "files loaded",
            Self::ReferenceSet => "reference set",
            Self::Initialized => "initialized",
        };
        f.write_str(name)
    }
}

enum Lifecycle {
    Unconfigured,
    FilesLoaded,
    ReferenceSet,
    Initialized(Arc<PreparedSession>),
}

impl Lifecycle {
    fn state(&self) -> SessionState {
        match self {
            Self::Unconfigured => SessionState::Unconfigured,
            Self::FilesLoaded => SessionState::FilesLoaded,
            Self::ReferenceSet => SessionState::ReferenceSet,
            Self::Initialized(_) => SessionState::Initialized,
        }
    }
}

/// One source as frozen by `init()`.
#[derive(Debug)]
pub(crate) struct PreparedSource {
    pub(crate) source: Arc<RasterSource>,
    pub(crate) plan: AlignmentPlan,
    pub(crate) bands: usize,
}

/// Everything iteration needs, immutable after `init()`.
#[derive(Debug)]
pub(crate) struct PreparedSession {
    pub(crate) reference: ReferenceGrid,
    pub(crate) indexer: BlockIndexer,
    /// Ascending time order.
    pub(crate) entries: Vec<PreparedSource>,
    pub(crate) config: LoaderConfig,
}

impl PreparedSession {
    /// Total blocks across all time steps.
    pub(crate) fn total_blocks(&self) -> usize {
        self.entries.len() * self.indexer.len()
    }

    pub(crate) fn entry(&self, time_key: &TimeKey) -> Option<&PreparedSource> {
        self.entries
            .binary_search_by_key(time_key, |e| e.source.time_key())
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Produce one block of `entry`, reading through `pool`.
    pub(crate) fn load_block<B: RasterBackend>(
        &self,
        entry: &PreparedSource,
        coordinate: BlockCoordinate,
        rect: &PixelWindow,
        pool: &mut SourceHandlePool<B>,
    ) -> std::result::Result<Block, BlockError> {
        let time_key = entry.source.time_key();
        let fill_value = self.config.fill_value;
        let transform = self
            .reference
            .transform
            .offset_by_pixels(rect.col_off, rect.row_off);

        let warped = match entry.plan.resolve_window(rect, fill_value) {
            WindowResolution::OutsideSource => {
                tracing::debug!(
                    time_key = %time_key,
                    block = %coordinate,
                    "Block lies outside source; filling"
                );
                None
            }
            WindowResolution::Read(request) => {
                tracing::debug!(
                    time_key = %time_key,
                    block = %coordinate,
                    window = %request.source_window,
                    "Reading block"
                );
                let warped = pool
                    .acquire(&entry.source)
                    .and_then(|handle| handle.read_warped(&request))
                    .map_err(|source| BlockError {
                        time_key,
                        coordinate,
                        path: entry.source.path().to_path_buf(),
                        source,
                    })?;
                Some(warped)
            }
        };

        Ok(Block::assemble(
            time_key,
            coordinate,
            self.indexer.spec(),
            rect,
            entry.bands,
            transform,
            fill_value,
            warped.as_ref(),
        ))
    }
}

/// A block loading session over one time series of rasters.
pub struct BlockLoader<B: RasterBackend> {
    backend: Arc<B>,
    spec: BlockSpec,
    config: LoaderConfig,
    registry: SourceRegistry,
    reference: Option<ReferenceGrid>,
    lifecycle: Lifecycle,
}

impl<B: RasterBackend> BlockLoader<B> {
    /// Create a session with the default configuration.
    pub fn new(backend: B, spec: BlockSpec) -> Self {
        Self {
            backend: Arc::new(backend),
            spec,
            config: LoaderConfig::default(),
            registry: SourceRegistry::new(),
            reference: None,
            lifecycle: Lifecycle::Unconfigured,
        }
    }

    /// Create a session with an explicit configuration.
    pub fn with_config(backend: B, spec: BlockSpec, config: LoaderConfig) -> Result<Self> {
        config.validate().map_err(LoaderError::InvalidConfig)?;
        Ok(Self {
            config,
            ..Self::new(backend, spec)
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn spec(&self) -> BlockSpec {
        self.spec
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// The staged reference grid, if any.
    pub fn reference(&self) -> Option<&ReferenceGrid> {
        self.reference.as_ref()
    }

    /// Register one raster.
    pub fn add_source(&mut self, time_key: TimeKey, path: impl AsRef<Path>) -> Result<()> {
        self.registry.add_source(time_key, path)?;
        self.invalidate();
        Ok(())
    }

    /// Register every raster of `dir` whose name parses with `rule`.
    pub fn add_files_from_directory(
        &mut self,
        dir: impl AsRef<Path>,
        rule: &TimeExtractionRule,
    ) -> Result<DirectoryScan> {
        let extension = self.backend.container_extension();
        let scan = self.registry.add_files_from_directory(dir, rule, extension)?;
        self.invalidate();
        Ok(scan)
    }

    /// Adopt the native grid of the source registered under `time_key`.
    pub fn set_reference_from_source(&mut self, time_key: TimeKey) -> Result<&ReferenceGrid> {
        let grid = reference_from_source(&self.registry, &*self.backend, time_key)?;
        tracing::info!(
            time_key = %time_key,
            crs = %grid.crs,
            width = grid.width,
            height = grid.height,
            "Reference grid set from source"
        );
        self.stage_reference(grid)
    }

    /// Adopt a caller-supplied grid.
    pub fn set_reference_explicit(&mut self, grid: ReferenceGrid) -> Result<&ReferenceGrid> {
        grid.validate()?;
        tracing::info!(
            crs = %grid.crs,
            width = grid.width,
            height = grid.height,
            "Reference grid set explicitly"
        );
        self.stage_reference(grid)
    }

    /// Derive a grid covering every registered source.
    pub fn derive_reference_from_sources(&mut self) -> Result<&ReferenceGrid> {
        let grid = derive_reference(&self.registry, &*self.backend)?;
        self.stage_reference(grid)
    }

    /// Store the grid before invalidating: the resulting state is read from it.
    fn stage_reference(&mut self, grid: ReferenceGrid) -> Result<&ReferenceGrid> {
        self.reference = Some(grid);
        self.invalidate();
        self.reference.as_ref().ok_or(LoaderError::MissingReference)
    }

    /// Leave `Initialized` (if there) and recompute the state from the data.
    fn invalidate(&mut self) {
        if matches!(self.lifecycle, Lifecycle::Initialized(_)) {
            tracing::debug!("Session invalidated; init() required before reading");
        }
        self.lifecycle = if self.registry.is_empty() {
            Lifecycle::Unconfigured
        } else if self.reference.is_none() {
            Lifecycle::FilesLoaded
        } else {
            Lifecycle::ReferenceSet
        };
    }

    /// Freeze sources and reference, building one alignment plan per source.
    ///
    /// Calling `init()` on an initialized session does nothing. On failure
    /// the session stays in its previous state.
    pub fn init(&mut self) -> Result<()> {
        if matches!(self.lifecycle, Lifecycle::Initialized(_)) {
            return Ok(());
        }
        if self.registry.is_empty() {
            return Err(LoaderError::NoSources);
        }
        let reference = self.reference.as_ref().ok_or(LoaderError::MissingReference)?;

        let mut entries = Vec::with_capacity(self.registry.len());
        for source in self.registry.sources() {
            let metadata = source.metadata(&*self.backend)?;
            let plan = build_plan(source.time_key(), metadata, reference, self.config.resampling)
                .map_err(|e| LoaderError::Alignment {
                    time_key: source.time_key(),
                    path: source.path().to_path_buf(),
                    source: e,
                })?;
            entries.push(PreparedSource {
                source: Arc::clone(source),
                plan,
                bands: metadata.bands,
            });
        }

        let indexer = BlockIndexer::new(reference, self.spec);
        let reprojected = entries.iter().filter(|e| e.plan.is_reprojection()).count();

        tracing::info!(
            sources = entries.len(),
            reprojected,
            block_rows = indexer.rows(),
            block_cols = indexer.cols(),
            method = %self.config.resampling,
            "Session initialized"
        );

        self.lifecycle = Lifecycle::Initialized(Arc::new(PreparedSession {
            reference: reference.clone(),
            indexer,
            entries,
            config: self.config.clone(),
        }));
        Ok(())
    }

    fn prepared(&self) -> Result<&Arc<PreparedSession>> {
        match &self.lifecycle {
            Lifecycle::Initialized(prepared) => Ok(prepared),
            other => Err(LoaderError::NotInitialized {
                state: other.state(),
            }),
        }
    }

    /// Block lattice of the initialized session.
    pub fn indexer(&self) -> Option<&BlockIndexer> {
        self.prepared().ok().map(|p| &p.indexer)
    }

    /// Alignment plan of one source in the initialized session.
    pub fn plan(&self, time_key: &TimeKey) -> Option<&AlignmentPlan> {
        self.prepared().ok()?.entry(time_key).map(|e| &e.plan)
    }

    /// Total number of blocks an iteration yields.
    pub fn block_count(&self) -> Result<usize> {
        Ok(self.prepared()?.total_blocks())
    }

    /// Lazily iterate every block, by time then row-major lattice position.
    pub fn blocks(&self) -> Result<BlockIter<B>> {
        let prepared = Arc::clone(self.prepared()?);
        Ok(BlockIter::new(prepared, Arc::clone(&self.backend)))
    }

    /// Read one block.
    pub fn read_block(&self, time_key: TimeKey, coordinate: BlockCoordinate) -> Result<Block> {
        let prepared = self.prepared()?;
        let entry = prepared
            .entry(&time_key)
            .ok_or(LoaderError::UnknownTimeKey { time_key })?;
        let rect = Self::rect_for(prepared, coordinate)?;
        let mut pool = SourceHandlePool::new(Arc::clone(&self.backend), 1);
        Ok(prepared.load_block(entry, coordinate, &rect, &mut pool)?)
    }

    /// Read the block at `coordinate` for every time step, in time order.
    pub fn read_block_series(&self, coordinate: BlockCoordinate) -> Result<Vec<Block>> {
        let prepared = self.prepared()?;
        let rect = Self::rect_for(prepared, coordinate)?;
        let mut pool = SourceHandlePool::new(Arc::clone(&self.backend), 1);
        let mut blocks = Vec::with_capacity(prepared.entries.len());
        for entry in &prepared.entries {
            blocks.push(prepared.load_block(entry, coordinate, &rect, &mut pool)?);
            pool.release(&entry.source.time_key());
        }
        Ok(blocks)
    }

    fn rect_for(prepared: &PreparedSession, coordinate: BlockCoordinate) -> Result<PixelWindow> {
        prepared
            .indexer
            .pixel_rect_for(coordinate)
            .ok_or(LoaderError::BlockOutOfRange {
                coordinate,
                rows: prepared.indexer.rows(),
                cols: prepared.indexer.cols(),
            })
    }
}

impl<B: RasterBackend + fmt::Debug> fmt::Debug for BlockLoader<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockLoader")
            .field("backend", &self.backend)
            .field("spec", &self.spec)
            .field("config", &self.config)
            .field("sources", &self.registry.len())
            .field("reference", &self.reference)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raster_common::{Crs, GeoTransform};
    use raster_io::{MemoryBackend, MemoryRaster, RasterMetadata};
    use test_utils::temp_dir_with_entries;

    fn day(d: u32) -> TimeKey {
        TimeKey::from_ymd(2024, 5, d).unwrap()
    }

    fn grid() -> ReferenceGrid {
        ReferenceGrid::new(
            Crs::new("EPSG:4326"),
            GeoTransform::from_origin(0.0, 8.0, 1.0, 1.0),
            8,
            8,
        )
    }

    fn loader_with(n: u32) -> (tempfile::TempDir, BlockLoader<MemoryBackend>) {
        let names: Vec<String> = (1..=n).map(|d| format!("{d}.zarr")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let dir = temp_dir_with_entries(&refs);
        let backend = MemoryBackend::new();
        let g = grid();
        for name in &names {
            let meta = RasterMetadata {
                crs: g.crs.clone(),
                transform: g.transform,
                width: g.width,
                height: g.height,
                bands: 1,
                nodata: None,
            };
            backend.insert(dir.path().join(name), MemoryRaster::new(meta, vec![1.0; 64]).unwrap());
        }
        let mut loader = BlockLoader::new(backend, BlockSpec::square(4).unwrap());
        for (i, name) in names.iter().enumerate() {
            loader.add_source(day(i as u32 + 1), dir.path().join(name)).unwrap();
        }
        (dir, loader)
    }

    #[test]
    fn test_state_transitions() {
        let backend = MemoryBackend::new();
        let mut loader = BlockLoader::new(backend, BlockSpec::square(4).unwrap());
        assert_eq!(loader.state(), SessionState::Unconfigured);

        loader.set_reference_explicit(grid()).unwrap();
        assert_eq!(loader.state(), SessionState::Unconfigured);
        assert!(matches!(loader.init(), Err(LoaderError::NoSources)));

        let (_dir, mut loader) = loader_with(1);
        assert_eq!(loader.state(), SessionState::FilesLoaded);
        assert!(matches!(loader.init(), Err(LoaderError::MissingReference)));
        assert_eq!(loader.state(), SessionState::FilesLoaded);

        loader.set_reference_from_source(day(1)).unwrap();
        assert_eq!(loader.state(), SessionState::ReferenceSet);
        loader.init().unwrap();
        assert_eq!(loader.state(), SessionState::Initialized);
    }

    #[test]
    fn test_reads_require_initialization() {
        let (_dir, mut loader) = loader_with(1);
        loader.set_reference_explicit(grid()).unwrap();

        let err = loader.blocks().err().unwrap();
        assert!(matches!(
            err,
            LoaderError::NotInitialized {
                state: SessionState::ReferenceSet
            }
        ));
        assert!(loader.read_block(day(1), BlockCoordinate::new(0, 0)).is_err());
        assert!(loader.indexer().is_none());
    }

    #[test]
    fn test_failed_init_keeps_prior_state() {
        let (_dir, mut loader) = loader_with(1);
        loader
            .set_reference_explicit(ReferenceGrid::new(
                Crs::new("LOCAL:SITE"),
                GeoTransform::from_origin(0.0, 8.0, 1.0, 1.0),
                8,
                8,
            ))
            .unwrap();
        let err = loader.init().unwrap_err();
        assert!(matches!(err, LoaderError::Alignment { time_key, .. } if time_key == day(1)));
        assert_eq!(loader.state(), SessionState::ReferenceSet);

        loader.set_reference_explicit(grid()).unwrap();
        loader.init().unwrap();
        assert_eq!(loader.state(), SessionState::Initialized);
    }

    #[test]
    fn test_read_block_bounds() {
        let (_dir, mut loader) = loader_with(2);
        loader.set_reference_explicit(grid()).unwrap();
        loader.init().unwrap();

        let block = loader.read_block(day(2), BlockCoordinate::new(1, 1)).unwrap();
        assert_eq!(block.time_key(), day(2));
        assert_eq!(block.valid_pixel_count(), 16);
        assert_eq!(block.transform(), &GeoTransform::from_origin(4.0, 4.0, 1.0, 1.0));

        assert!(matches!(
            loader.read_block(day(2), BlockCoordinate::new(2, 0)),
            Err(LoaderError::BlockOutOfRange { rows: 2, cols: 2, .. })
        ));
        assert!(matches!(
            loader.read_block(day(9), BlockCoordinate::new(0, 0)),
            Err(LoaderError::UnknownTimeKey { .. })
        ));
    }

    #[test]
    fn test_read_block_series() {
        let (_dir, mut loader) = loader_with(3);
        loader.set_reference_explicit(grid()).unwrap();
        loader.init().unwrap();

        let series = loader.read_block_series(BlockCoordinate::new(0, 1)).unwrap();
        let keys: Vec<_> = series.iter().map(Block::time_key).collect();
        assert_eq!(keys, vec![day(1), day(2), day(3)]);
        assert!(series.iter().all(|b| b.coordinate() == BlockCoordinate::new(0, 1)));
        assert_eq!(loader.backend().live_handles(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = LoaderConfig {
            max_open_handles: 0,
            ..Default::default()
        };
        let result = BlockLoader::with_config(MemoryBackend::new(), BlockSpec::square(4).unwrap(), config);
        assert!(matches!(result, Err(LoaderError::InvalidConfig(_))));
    }
}
