//! Zarr V3 writer for building georeferenced test rasters on disk.
//!
//! Produces arrays that `raster_io::ZarrBackend` can open: float32,
//! `[rows, cols]` for single-band rasters and `[bands, rows, cols]`
//! otherwise, with the CRS, geotransform and nodata stored as attributes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use raster_io::backend::zarr::{ATTR_CRS, ATTR_GEO_TRANSFORM, ATTR_NODATA};
use raster_io::RasterMetadata;
use thiserror::Error;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

/// Errors from writing a test raster.
#[derive(Error, Debug)]
pub enum ZarrWriteError {
    #[error("invalid writer configuration: {0}")]
    Config(String),

    #[error("raster data holds {actual} values, expected {expected}")]
    DataLength { actual: usize, expected: usize },

    #[error("Zarr format error: {0}")]
    Zarr(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for ZarrWriteError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Compression codec for Zarr arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZarrCompression {
    /// No compression.
    None,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    #[default]
    BloscZstd,
}

impl ZarrCompression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration for writing rasters as Zarr V3 arrays.
#[derive(Debug, Clone)]
pub struct ZarrWriterConfig {
    /// Chunk dimension for the spatial axes (square chunks).
    pub chunk_size: usize,

    /// Compression codec.
    pub compression: ZarrCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Enable byte shuffle filter.
    pub shuffle: bool,
}

impl Default for ZarrWriterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256,
            compression: ZarrCompression::BloscZstd,
            compression_level: 1,
            shuffle: true,
        }
    }
}

impl ZarrWriterConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.compression != ZarrCompression::None
            && (self.compression_level == 0 || self.compression_level > 9)
        {
            return Err("compression_level must be 1-9".to_string());
        }

        Ok(())
    }
}

/// Result of writing a Zarr raster.
#[derive(Debug)]
pub struct ZarrWriteResult {
    /// Directory the array was written to.
    pub path: PathBuf,
    /// Array shape, outermost dimension first.
    pub shape: Vec<u64>,
    /// Chunk shape, outermost dimension first.
    pub chunk_shape: Vec<u64>,
    /// Compression codec used.
    pub compression: String,
    /// Total uncompressed bytes written.
    pub bytes_written: u64,
}

/// Writer for creating georeferenced Zarr V3 arrays.
pub struct ZarrRasterWriter {
    config: ZarrWriterConfig,
}

impl ZarrRasterWriter {
    pub fn new(config: ZarrWriterConfig) -> Self {
        Self { config }
    }

    /// Write a raster to a Zarr array rooted at `path`.
    ///
    /// `data` is band-major: `metadata.bands` row-major planes of
    /// `metadata.width * metadata.height` values.
    pub fn write(
        &self,
        path: &Path,
        metadata: &RasterMetadata,
        data: &[f32],
    ) -> Result<ZarrWriteResult, ZarrWriteError> {
        self.config.validate().map_err(ZarrWriteError::Config)?;

        let expected = metadata.width * metadata.height * metadata.bands;
        if data.len() != expected || expected == 0 {
            return Err(ZarrWriteError::DataLength {
                actual: data.len(),
                expected,
            });
        }

        std::fs::create_dir_all(path)?;
        let store =
            FilesystemStore::new(path).map_err(|e| ZarrWriteError::Storage(e.to_string()))?;

        let chunk = self.config.chunk_size as u64;
        let (shape, chunk_shape) = if metadata.bands == 1 {
            (
                vec![metadata.height as u64, metadata.width as u64],
                vec![chunk, chunk],
            )
        } else {
            (
                vec![
                    metadata.bands as u64,
                    metadata.height as u64,
                    metadata.width as u64,
                ],
                vec![1, chunk, chunk],
            )
        };

        let mut attrs = serde_json::Map::new();
        attrs.insert(
            ATTR_CRS.to_string(),
            serde_json::json!(metadata.crs.as_str()),
        );
        attrs.insert(
            ATTR_GEO_TRANSFORM.to_string(),
            serde_json::json!(metadata.transform.to_gdal()),
        );
        if let Some(nodata) = metadata.nodata {
            attrs.insert(ATTR_NODATA.to_string(), serde_json::json!(nodata));
        }

        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .clone()
            .try_into()
            .map_err(|e| ZarrWriteError::Config(format!("{:?}", e)))?;

        let fill_value = metadata.nodata.unwrap_or(f32::NAN);
        let mut binding = ArrayBuilder::new(
            shape.clone(),
            DataType::Float32,
            chunk_grid,
            FillValue::from(fill_value),
        );
        let mut builder = binding.attributes(attrs);

        if let Some(codec) = self.compression_codec()? {
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let array = builder
            .build(Arc::new(store), "/")
            .map_err(|e| ZarrWriteError::Zarr(e.to_string()))?;

        array
            .store_metadata()
            .map_err(|e| ZarrWriteError::Storage(e.to_string()))?;

        let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape.clone())
            .map_err(|e| ZarrWriteError::Zarr(e.to_string()))?;

        array
            .store_array_subset_elements(&subset, data)
            .map_err(|e| ZarrWriteError::Storage(e.to_string()))?;

        let bytes_written = std::mem::size_of_val(data) as u64;

        tracing::debug!(
            path = %path.display(),
            shape = ?shape,
            compression = %self.config.compression,
            bytes = bytes_written,
            "Wrote Zarr raster"
        );

        Ok(ZarrWriteResult {
            path: path.to_path_buf(),
            shape,
            chunk_shape,
            compression: self.config.compression.as_str().to_string(),
            bytes_written,
        })
    }

    /// Blosc codec for the configured compression, if any.
    fn compression_codec(
        &self,
    ) -> Result<Option<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>>, ZarrWriteError>
    {
        let compressor = match self.config.compression {
            ZarrCompression::None => return Ok(None),
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let level = BloscCompressionLevel::try_from(self.config.compression_level)
            .map_err(|_| ZarrWriteError::Config("invalid compression level".to_string()))?;

        let shuffle = if self.config.shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = self.config.shuffle.then_some(std::mem::size_of::<f32>());

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| ZarrWriteError::Config(e.to_string()))?;

        Ok(Some(Arc::new(codec)))
    }
}
