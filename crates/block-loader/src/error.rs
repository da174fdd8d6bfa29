//! Error types for the block loader.

use std::path::PathBuf;

use projection::ProjectionError;
use raster_common::TimeKey;
use raster_io::RasterIoError;
use thiserror::Error;

use crate::planner::PlanError;
use crate::session::SessionState;
use crate::types::BlockCoordinate;

/// Errors raised while configuring, initializing or reading from a session.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// A source is already registered for this time key.
    #[error("a source is already registered for time key {time_key}")]
    DuplicateTimeKey { time_key: TimeKey },

    /// The path does not resolve to an existing filesystem entry.
    #[error("invalid path {path}: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory scan registered no sources.
    #[error("no matching files in {dir} ({skipped} entries skipped)")]
    NoMatchingFiles { dir: PathBuf, skipped: usize },

    /// No source is registered for this time key.
    #[error("no source registered for time key {time_key}")]
    UnknownTimeKey { time_key: TimeKey },

    /// The reference grid is unusable.
    #[error("invalid reference grid: {0}")]
    InvalidReference(String),

    /// The reference grid transform cannot be inverted.
    #[error("reference grid transform {transform:?} is degenerate")]
    DegenerateTransform { transform: [f64; 6] },

    /// Invalid loader configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reading a source's metadata failed.
    #[error("failed to read metadata of {path} ({time_key}): {source}")]
    Metadata {
        time_key: TimeKey,
        path: PathBuf,
        #[source]
        source: RasterIoError,
    },

    /// A source's extent could not be expressed in another CRS.
    #[error("cannot project extent of source {time_key}: {source}")]
    Projection {
        time_key: TimeKey,
        #[source]
        source: ProjectionError,
    },

    /// A source cannot be aligned to the reference grid.
    #[error("cannot align {path} ({time_key}) to the reference grid: {source}")]
    Alignment {
        time_key: TimeKey,
        path: PathBuf,
        #[source]
        source: PlanError,
    },

    /// `init()` was called without any registered source.
    #[error("no sources registered")]
    NoSources,

    /// `init()` was called before a reference grid was set.
    #[error("no reference grid set")]
    MissingReference,

    /// The operation requires an initialized session.
    #[error("session is not initialized (state: {state})")]
    NotInitialized { state: SessionState },

    /// The block coordinate is outside the lattice.
    #[error("block {coordinate} is outside the {rows}x{cols} lattice")]
    BlockOutOfRange {
        coordinate: BlockCoordinate,
        rows: usize,
        cols: usize,
    },

    /// Producing a block failed.
    #[error(transparent)]
    Block(#[from] BlockError),
}

/// Failure to produce one block, located by time key, block and path.
#[derive(Error, Debug)]
#[error("failed to read block {coordinate} of {path} ({time_key}): {source}")]
pub struct BlockError {
    pub time_key: TimeKey,
    pub coordinate: BlockCoordinate,
    pub path: PathBuf,
    #[source]
    pub source: RasterIoError,
}

/// Result type for block loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;
