//! Time-ordered registry of raster sources.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use raster_common::{TimeExtractionRule, TimeKey, TimeParseError};
use raster_io::{RasterBackend, RasterMetadata};
use walkdir::WalkDir;

use crate::error::{LoaderError, Result};

/// One raster in the time series.
///
/// Native metadata is read on first access and cached for the lifetime of
/// the source.
#[derive(Debug)]
pub struct RasterSource {
    time_key: TimeKey,
    path: PathBuf,
    metadata: OnceCell<RasterMetadata>,
}

impl RasterSource {
    fn new(time_key: TimeKey, path: PathBuf) -> Self {
        Self {
            time_key,
            path,
            metadata: OnceCell::new(),
        }
    }

    pub fn time_key(&self) -> TimeKey {
        self.time_key
    }

    /// Canonical path of the raster.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Native metadata, read through `backend` on first call.
    pub fn metadata<B: RasterBackend>(&self, backend: &B) -> Result<&RasterMetadata> {
        self.metadata.get_or_try_init(|| {
            tracing::debug!(
                time_key = %self.time_key,
                path = %self.path.display(),
                "Reading source metadata"
            );
            backend
                .read_metadata(&self.path)
                .map_err(|source| LoaderError::Metadata {
                    time_key: self.time_key,
                    path: self.path.clone(),
                    source,
                })
        })
    }

    /// Metadata if it has already been read.
    pub fn cached_metadata(&self) -> Option<&RasterMetadata> {
        self.metadata.get()
    }
}

/// Why a directory entry was not registered.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The file name did not yield a time key.
    Unparseable(TimeParseError),
    /// Another source already holds the parsed time key.
    DuplicateTimeKey(TimeKey),
    /// The entry could not be resolved.
    Unreadable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unparseable(e) => write!(f, "{e}"),
            Self::DuplicateTimeKey(key) => write!(f, "duplicate time key {key}"),
            Self::Unreadable(msg) => write!(f, "unreadable: {msg}"),
        }
    }
}

/// A directory entry that was skipped during a scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Outcome of [`SourceRegistry::add_files_from_directory`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryScan {
    /// Registered entries, in scan order.
    pub added: Vec<(TimeKey, PathBuf)>,
    /// Entries with the right extension that were not registered.
    pub skipped: Vec<SkippedEntry>,
}

/// Mapping from time key to raster source, iterated in ascending time order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<TimeKey, Arc<RasterSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` under `time_key`.
    ///
    /// The path is canonicalized and must exist. A repeated time key is
    /// rejected and leaves the existing entry untouched.
    pub fn add_source(&mut self, time_key: TimeKey, path: impl AsRef<Path>) -> Result<&Arc<RasterSource>> {
        if self.sources.contains_key(&time_key) {
            return Err(LoaderError::DuplicateTimeKey { time_key });
        }

        let path = path.as_ref();
        let canonical = std::fs::canonicalize(path)
            .and_then(|p| std::fs::metadata(&p).map(|_| p))
            .map_err(|source| LoaderError::InvalidPath {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!(time_key = %time_key, path = %canonical.display(), "Registered source");

        Ok(self
            .sources
            .entry(time_key)
            .or_insert_with(|| Arc::new(RasterSource::new(time_key, canonical))))
    }

    /// Register every entry of `dir` whose extension is `extension`.
    ///
    /// The scan is not recursive. Entries whose names do not parse with
    /// `rule`, or whose time key is already taken, are skipped and reported.
    /// Fails with [`LoaderError::NoMatchingFiles`] if nothing was added.
    pub fn add_files_from_directory(
        &mut self,
        dir: impl AsRef<Path>,
        rule: &TimeExtractionRule,
        extension: &str,
    ) -> Result<DirectoryScan> {
        let dir = dir.as_ref();
        std::fs::read_dir(dir).map_err(|source| LoaderError::InvalidPath {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut scan = DirectoryScan::default();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    scan.skipped.push(SkippedEntry {
                        path,
                        reason: SkipReason::Unreadable(e.to_string()),
                    });
                    continue;
                }
            };

            let path = entry.path();
            let matches_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if !matches_extension {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let reason = match rule.extract(&name) {
                Err(e) => SkipReason::Unparseable(e),
                Ok(time_key) => match self.add_source(time_key, path) {
                    Ok(_) => {
                        scan.added.push((time_key, path.to_path_buf()));
                        continue;
                    }
                    Err(LoaderError::DuplicateTimeKey { time_key }) => {
                        SkipReason::DuplicateTimeKey(time_key)
                    }
                    Err(e) => SkipReason::Unreadable(e.to_string()),
                },
            };

            tracing::warn!(path = %path.display(), reason = %reason, "Skipping file");
            scan.skipped.push(SkippedEntry {
                path: path.to_path_buf(),
                reason,
            });
        }

        if scan.added.is_empty() {
            return Err(LoaderError::NoMatchingFiles {
                dir: dir.to_path_buf(),
                skipped: scan.skipped.len(),
            });
        }

        tracing::info!(
            dir = %dir.display(),
            added = scan.added.len(),
            skipped = scan.skipped.len(),
            "Scanned directory"
        );

        Ok(scan)
    }

    /// Sources in ascending time order. Each call starts a fresh walk.
    pub fn sources(&self) -> impl Iterator<Item = &Arc<RasterSource>> + Clone + '_ {
        self.sources.values()
    }

    pub fn get(&self, time_key: &TimeKey) -> Option<&Arc<RasterSource>> {
        self.sources.get(time_key)
    }

    pub fn contains(&self, time_key: &TimeKey) -> bool {
        self.sources.contains_key(time_key)
    }

    /// Registered time keys in ascending order.
    pub fn time_keys(&self) -> impl Iterator<Item = TimeKey> + '_ {
        self.sources.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
