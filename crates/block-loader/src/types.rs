//! Grid and block types shared across the loader.

use std::fmt;

use raster_common::{BoundingBox, Crs, GeoTransform};
use raster_io::RasterMetadata;
use serde::{Deserialize, Serialize};

use crate::error::{LoaderError, Result};

/// Size of every block in reference-grid pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockSpec {
    block_width: usize,
    block_height: usize,
}

impl BlockSpec {
    /// Create a block spec; both dimensions must be non-zero.
    pub fn new(block_width: usize, block_height: usize) -> Result<Self> {
        if block_width == 0 || block_height == 0 {
            return Err(LoaderError::InvalidConfig(format!(
                "block size must be non-zero, got {block_width}x{block_height}"
            )));
        }
        Ok(Self {
            block_width,
            block_height,
        })
    }

    /// Square blocks.
    pub fn square(size: usize) -> Result<Self> {
        Self::new(size, size)
    }

    pub fn block_width(&self) -> usize {
        self.block_width
    }

    pub fn block_height(&self) -> usize {
        self.block_height
    }

    /// Pixels per block.
    pub fn pixels(&self) -> usize {
        self.block_width * self.block_height
    }
}

/// Position of a block in the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockCoordinate {
    pub row_index: usize,
    pub col_index: usize,
}

impl BlockCoordinate {
    pub fn new(row_index: usize, col_index: usize) -> Self {
        Self {
            row_index,
            col_index,
        }
    }
}

impl fmt::Display for BlockCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row_index, self.col_index)
    }
}

/// The grid every block is expressed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGrid {
    pub crs: Crs,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
}

impl ReferenceGrid {
    pub fn new(crs: Crs, transform: GeoTransform, width: usize, height: usize) -> Self {
        Self {
            crs,
            transform,
            width,
            height,
        }
    }

    /// The native grid of a raster.
    pub fn from_metadata(metadata: &RasterMetadata) -> Self {
        Self::new(
            metadata.crs.clone(),
            metadata.transform,
            metadata.width,
            metadata.height,
        )
    }

    /// Extent in the grid's CRS.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// Reject grids that cannot carry blocks.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(LoaderError::InvalidReference(format!(
                "grid size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.transform.is_degenerate() {
            return Err(LoaderError::DegenerateTransform {
                transform: self.transform.to_gdal(),
            });
        }
        Ok(())
    }
}
