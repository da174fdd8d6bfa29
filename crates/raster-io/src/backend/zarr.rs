//! Zarr V3 filesystem backend.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use raster_common::{Crs, GeoTransform};

use super::{check_window, RasterBackend, RasterHandle};
use crate::error::{RasterIoError, Result};
use crate::types::{PixelWindow, RasterMetadata};

/// Attribute holding the CRS identifier.
pub const ATTR_CRS: &str = "crs";
/// Attribute holding the six GDAL-ordered geotransform coefficients.
pub const ATTR_GEO_TRANSFORM: &str = "geo_transform";
/// Optional attribute holding the nodata value.
pub const ATTR_NODATA: &str = "nodata";

/// Backend reading georeferenced Zarr V3 arrays from the local filesystem.
///
/// Each raster is one Zarr array stored at the root of a `*.zarr`
/// directory, shaped `[rows, cols]` or `[bands, rows, cols]`, float32.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZarrBackend;

impl ZarrBackend {
    pub fn new() -> Self {
        Self
    }
}

impl RasterBackend for ZarrBackend {
    type Handle = ZarrHandle;

    fn container_extension(&self) -> &'static str {
        "zarr"
    }

    fn open(&self, path: &Path) -> Result<ZarrHandle> {
        ZarrHandle::open(path)
    }
}

/// An open Zarr raster.
pub struct ZarrHandle {
    path: PathBuf,
    array: Array<FilesystemStore>,
    metadata: RasterMetadata,
}

impl std::fmt::Debug for ZarrHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZarrHandle")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl ZarrHandle {
    /// Open the Zarr array rooted at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let store = FilesystemStore::new(path)
            .map_err(|e| RasterIoError::open_failed(path, e.to_string()))?;

        let array = Array::open(Arc::new(store), "/")
            .map_err(|e| RasterIoError::open_failed(path, e.to_string()))?;

        let metadata = Self::extract_metadata(path, &array)?;

        tracing::debug!(
            path = %path.display(),
            width = metadata.width,
            height = metadata.height,
            bands = metadata.bands,
            crs = %metadata.crs,
            "Opened Zarr raster"
        );

        Ok(Self {
            path: path.to_path_buf(),
            array,
            metadata,
        })
    }

    /// Extract georeferencing from Zarr array attributes.
    fn extract_metadata(path: &Path, array: &Array<FilesystemStore>) -> Result<RasterMetadata> {
        let attrs = array.attributes();
        let shape = array.shape();

        let (bands, height, width) = match *shape {
            [rows, cols] => (1, rows as usize, cols as usize),
            [bands, rows, cols] => (bands as usize, rows as usize, cols as usize),
            _ => {
                return Err(RasterIoError::invalid_metadata(
                    path,
                    format!("array must have 2 or 3 dimensions, found {}", shape.len()),
                ))
            }
        };

        if array.data_type() != &DataType::Float32 {
            return Err(RasterIoError::invalid_metadata(
                path,
                format!("unsupported data type {:?}", array.data_type()),
            ));
        }

        let crs = attrs
            .get(ATTR_CRS)
            .and_then(|v| v.as_str())
            .map(Crs::new)
            .ok_or_else(|| {
                RasterIoError::invalid_metadata(path, format!("missing '{ATTR_CRS}' attribute"))
            })?;

        let coefficients: Vec<f64> = attrs
            .get(ATTR_GEO_TRANSFORM)
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|c| c.as_f64()).collect())
            .unwrap_or_default();
        let coefficients: [f64; 6] = coefficients.try_into().map_err(|_| {
            RasterIoError::invalid_metadata(
                path,
                format!("'{ATTR_GEO_TRANSFORM}' must be 6 numbers"),
            )
        })?;

        let nodata = attrs
            .get(ATTR_NODATA)
            .and_then(|v| v.as_f64())
            .map(|v| v as f32);

        Ok(RasterMetadata {
            crs,
            transform: GeoTransform::from_gdal(coefficients),
            width,
            height,
            bands,
            nodata,
        })
    }

    fn subset_for(&self, window: &PixelWindow) -> Result<ArraySubset> {
        let (start, shape) = if self.array.shape().len() == 3 {
            (
                vec![0, window.row_off as u64, window.col_off as u64],
                vec![
                    self.metadata.bands as u64,
                    window.height as u64,
                    window.width as u64,
                ],
            )
        } else {
            (
                vec![window.row_off as u64, window.col_off as u64],
                vec![window.height as u64, window.width as u64],
            )
        };
        ArraySubset::new_with_start_shape(start, shape)
            .map_err(|e| RasterIoError::read_failed(&self.path, e.to_string()))
    }
}

impl RasterHandle for ZarrHandle {
    fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> &RasterMetadata {
        &self.metadata
    }

    fn read_window(&mut self, window: &PixelWindow) -> Result<Vec<f32>> {
        check_window(&self.path, &self.metadata, window)?;

        // Zarr uses [band, row, col] ordering, which is already band-major
        let subset = self.subset_for(window)?;
        let data: Vec<f32> = self
            .array
            .retrieve_array_subset_elements(&subset)
            .map_err(|e| RasterIoError::read_failed(&self.path, e.to_string()))?;

        tracing::trace!(
            path = %self.path.display(),
            window = %window,
            values = data.len(),
            "Read Zarr window"
        );

        Ok(data)
    }
}
