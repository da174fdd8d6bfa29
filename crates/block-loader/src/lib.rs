//! Lazy, co-registered block iteration over time series of rasters.
//!
//! A [`BlockLoader`] holds rasters keyed by timestamp, aligns all of them to
//! one reference grid and yields fixed-size blocks of that grid, one time
//! step after another, reading only the source pixels each block needs.
//!
//! # Architecture
//!
//! ```text
//! SourceRegistry ──► reference grid (from a source, explicit or derived)
//!       │                    │
//!       └────────┬───────────┘
//!                ▼
//!            init()  ──► AlignmentPlan per source + BlockIndexer lattice
//!                │
//!                ▼
//!           BlockIter  (time key, then row-major blocks)
//!                │
//!                ├─► SourceHandlePool::acquire()
//!                ├─► AlignmentPlan::resolve_window()
//!                └─► RasterHandle::read_warped() ──► Block
//! ```
//!
//! # Example
//!
//! ```no_run
//! use block_loader::{BlockLoader, BlockSpec};
//! use raster_common::TimeExtractionRule;
//! use raster_io::ZarrBackend;
//!
//! # fn main() -> block_loader::Result<()> {
//! let mut loader = BlockLoader::new(ZarrBackend::new(), BlockSpec::square(256)?);
//! loader.add_files_from_directory("/data/scenes", &TimeExtractionRule::new(0, Some(8), "%Y%m%d"))?;
//! loader.derive_reference_from_sources()?;
//! loader.init()?;
//!
//! for block in loader.blocks()? {
//!     let block = block?;
//!     println!("{} {} valid={}", block.time_key(), block.coordinate(), block.valid_pixel_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod config;
pub mod error;
pub mod indexer;
pub mod iterator;
pub mod planner;
pub mod pool;
pub mod reference;
pub mod registry;
pub mod session;
pub mod types;

pub use block::Block;
pub use config::LoaderConfig;
pub use error::{BlockError, LoaderError, Result};
pub use indexer::{lattice_dimensions, BlockIndexer};
pub use iterator::BlockIter;
pub use planner::{build_plan, AlignmentMode, AlignmentPlan, PlanError, WindowResolution};
pub use pool::{PoolStats, SourceHandlePool};
pub use reference::{derive_reference, reference_from_source};
pub use registry::{DirectoryScan, RasterSource, SkipReason, SkippedEntry, SourceRegistry};
pub use session::{BlockLoader, SessionState};
pub use types::{BlockCoordinate, BlockSpec, ReferenceGrid};
