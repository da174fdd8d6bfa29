//! Core types for raster reads.

use raster_common::{BoundingBox, Crs, GeoTransform};
use serde::{Deserialize, Serialize};

/// Georeferencing and layout of one raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    /// Native coordinate reference system.
    pub crs: Crs,
    /// Pixel → CRS affine transform.
    pub transform: GeoTransform,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Number of bands.
    pub bands: usize,
    /// Nodata sentinel, if the raster declares one.
    pub nodata: Option<f32>,
}

impl RasterMetadata {
    /// Native extent in the raster's own CRS.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// Window covering the whole raster.
    pub fn full_window(&self) -> PixelWindow {
        PixelWindow::new(0, 0, self.width, self.height)
    }

    /// Check whether a sample value is valid data.
    pub fn is_valid_value(&self, value: f32) -> bool {
        !value.is_nan() && self.nodata.map_or(true, |nd| value != nd)
    }
}

/// A rectangular window of pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// Exclusive end column.
    pub fn col_end(&self) -> usize {
        self.col_off + self.width
    }

    /// Exclusive end row.
    pub fn row_end(&self) -> usize {
        self.row_off + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels in the window.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if `other` lies entirely within this window.
    pub fn contains(&self, other: &PixelWindow) -> bool {
        other.col_off >= self.col_off
            && other.row_off >= self.row_off
            && other.col_end() <= self.col_end()
            && other.row_end() <= self.row_end()
    }

    /// Overlap of two windows, `None` when they do not overlap.
    pub fn intersection(&self, other: &PixelWindow) -> Option<PixelWindow> {
        let col_off = self.col_off.max(other.col_off);
        let row_off = self.row_off.max(other.row_off);
        let col_end = self.col_end().min(other.col_end());
        let row_end = self.row_end().min(other.row_end());
        if col_off >= col_end || row_off >= row_end {
            return None;
        }
        Some(PixelWindow::new(
            col_off,
            row_off,
            col_end - col_off,
            row_end - row_off,
        ))
    }
}

impl std::fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[cols {}..{}, rows {}..{}]",
            self.col_off,
            self.col_end(),
            self.row_off,
            self.row_end()
        )
    }
}

/// Resampling method used when a destination pixel falls between source
/// pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    /// Nearest neighbor (preserves exact values).
    #[default]
    Nearest,
    /// Bilinear interpolation (smooth, slight value changes).
    Bilinear,
    /// Bicubic interpolation (smoothest, more compute).
    Cubic,
}

impl ResamplingMethod {
    /// Parse from string (case-insensitive); unknown names fall back to nearest.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "bilinear" | "linear" => Self::Bilinear,
            "cubic" | "bicubic" => Self::Cubic,
            _ => Self::Nearest,
        }
    }

    /// Extra source pixels needed on each side of the sampled footprint.
    pub fn kernel_radius(&self) -> usize {
        match self {
            Self::Nearest => 0,
            Self::Bilinear => 1,
            Self::Cubic => 2,
        }
    }
}

impl std::fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Cubic => write!(f, "cubic"),
        }
    }
}

/// A read-and-resample request against one open raster.
///
/// `coords` holds one continuous source pixel coordinate `[col, row]` per
/// destination pixel, row-major over `width` × `height`. Pixel centres sit at
/// `+0.5`. Non-finite coordinates mark destination pixels with no source.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpRequest {
    /// Source window to decode; every finite coordinate's kernel lies inside it.
    pub source_window: PixelWindow,
    /// Destination width in pixels.
    pub width: usize,
    /// Destination height in pixels.
    pub height: usize,
    /// Source sample coordinates, `width * height` entries.
    pub coords: Vec<[f64; 2]>,
    /// Resampling method.
    pub method: ResamplingMethod,
    /// Value written where no valid sample exists.
    pub fill_value: f32,
}

impl WarpRequest {
    /// Check the request is internally consistent.
    pub fn validate(&self) -> crate::Result<()> {
        if self.coords.len() != self.width * self.height {
            return Err(crate::RasterIoError::InvalidRequest(format!(
                "{} coordinates for a {}x{} destination",
                self.coords.len(),
                self.width,
                self.height
            )));
        }
        if self.source_window.is_empty() {
            return Err(crate::RasterIoError::InvalidRequest(
                "empty source window".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output of a warp: pixel-interleaved values plus a per-pixel valid mask.
#[derive(Debug, Clone, PartialEq)]
pub struct WarpedRaster {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    /// `height * width * bands` values, index `(row * width + col) * bands + band`.
    pub data: Vec<f32>,
    /// `height * width` flags, true where every band holds a valid sample.
    pub valid: Vec<bool>,
}

impl WarpedRaster {
    /// A raster with every pixel set to `fill_value` and marked invalid.
    pub fn filled(width: usize, height: usize, bands: usize, fill_value: f32) -> Self {
        Self {
            width,
            height,
            bands,
            data: vec![fill_value; width * height * bands],
            valid: vec![false; width * height],
        }
    }

    /// Value at a pixel and band.
    pub fn get(&self, col: usize, row: usize, band: usize) -> Option<f32> {
        if col >= self.width || row >= self.height || band >= self.bands {
            return None;
        }
        self.data.get((row * self.width + col) * self.bands + band).copied()
    }
}
