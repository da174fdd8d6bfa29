//! Affine pixel-to-world transforms.
//!
//! Coefficients follow the GDAL geotransform ordering:
//!
//! ```text
//! x = c0 + col * c1 + row * c2
//! y = c3 + col * c4 + row * c5
//! ```
//!
//! `col`/`row` are continuous pixel coordinates: the top-left corner of pixel
//! `(0, 0)` is `(0.0, 0.0)` and its centre is `(0.5, 0.5)`.

use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// Six-parameter affine transform from pixel space to CRS coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X of the top-left corner of the grid
    pub origin_x: f64,
    /// Pixel width (x change per column)
    pub pixel_width: f64,
    /// Row rotation (x change per row)
    pub row_rotation: f64,
    /// Y of the top-left corner of the grid
    pub origin_y: f64,
    /// Column rotation (y change per column)
    pub col_rotation: f64,
    /// Pixel height (y change per row, negative for north-up rasters)
    pub pixel_height: f64,
}

const DEGENERATE_EPSILON: f64 = 1e-15;

impl GeoTransform {
    /// Build from GDAL-ordered coefficients.
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// GDAL-ordered coefficients.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// North-up transform from the top-left corner and positive resolutions.
    pub fn from_origin(left: f64, top: f64, res_x: f64, res_y: f64) -> Self {
        Self::from_gdal([left, res_x, 0.0, top, 0.0, -res_y])
    }

    /// Determinant of the linear part.
    pub fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// A transform is degenerate when it cannot be inverted (zero pixel size,
    /// collinear axes) or carries non-finite coefficients.
    pub fn is_degenerate(&self) -> bool {
        !self.to_gdal().iter().all(|c| c.is_finite())
            || self.determinant().abs() < DEGENERATE_EPSILON
    }

    /// Map continuous pixel coordinates to CRS coordinates.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Map CRS coordinates to continuous pixel coordinates.
    ///
    /// Returns `None` for degenerate transforms.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        self.inverse().map(|inv| inv.pixel_to_world(x, y))
    }

    /// The inverse affine (world → pixel), if it exists.
    pub fn inverse(&self) -> Option<GeoTransform> {
        if self.is_degenerate() {
            return None;
        }
        let det = self.determinant();
        let a = self.pixel_height / det;
        let b = -self.row_rotation / det;
        let d = -self.col_rotation / det;
        let e = self.pixel_width / det;

        Some(GeoTransform {
            origin_x: -(a * self.origin_x + b * self.origin_y),
            pixel_width: a,
            row_rotation: b,
            origin_y: -(d * self.origin_x + e * self.origin_y),
            col_rotation: d,
            pixel_height: e,
        })
    }

    /// Compose two affines: the result applies `inner` first, then `self`.
    pub fn then_after(&self, inner: &GeoTransform) -> GeoTransform {
        let (ox, oy) = self.pixel_to_world(inner.origin_x, inner.origin_y);
        GeoTransform {
            origin_x: ox,
            pixel_width: self.pixel_width * inner.pixel_width
                + self.row_rotation * inner.col_rotation,
            row_rotation: self.pixel_width * inner.row_rotation
                + self.row_rotation * inner.pixel_height,
            origin_y: oy,
            col_rotation: self.col_rotation * inner.pixel_width
                + self.pixel_height * inner.col_rotation,
            pixel_height: self.col_rotation * inner.row_rotation
                + self.pixel_height * inner.pixel_height,
        }
    }

    /// Transform of a sub-grid whose top-left pixel is `(col_off, row_off)`.
    pub fn offset_by_pixels(&self, col_off: usize, row_off: usize) -> GeoTransform {
        let (origin_x, origin_y) = self.pixel_to_world(col_off as f64, row_off as f64);
        GeoTransform {
            origin_x,
            origin_y,
            ..*self
        }
    }

    /// Extent covered by a `width` × `height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
            .map(|(c, r)| self.pixel_to_world(c, r));
        BoundingBox::from_points(corners).unwrap_or_else(|| {
            let (x, y) = self.pixel_to_world(0.0, 0.0);
            BoundingBox::new(x, y, x, y)
        })
    }

    /// Absolute pixel size along each axis (x, y).
    pub fn resolution(&self) -> (f64, f64) {
        (
            self.pixel_width.hypot(self.col_rotation),
            self.row_rotation.hypot(self.pixel_height),
        )
    }
}
