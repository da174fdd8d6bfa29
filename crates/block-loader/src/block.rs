//! Co-registered blocks handed to consumers.

use raster_common::{GeoTransform, TimeKey};
use raster_io::{PixelWindow, WarpedRaster};

use crate::types::{BlockCoordinate, BlockSpec};

/// One block of one time step, on the reference grid.
///
/// Pixels are stored row-major and pixel-interleaved: the value of band `b`
/// at `(row, col)` is `data[(row * width + col) * bands + b]`. Every block
/// has the full [`BlockSpec`] size; pixels past the reference grid edge, or
/// without valid source data, hold the fill value and are marked invalid.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    time_key: TimeKey,
    coordinate: BlockCoordinate,
    width: usize,
    height: usize,
    bands: usize,
    data: Vec<f32>,
    valid: Vec<bool>,
    transform: GeoTransform,
}

impl Block {
    /// Lay a warped rectangle into a full-size block.
    ///
    /// `warped` covers `rect` (the block's part of the reference grid); `None`
    /// means the source does not cover the block at all.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        time_key: TimeKey,
        coordinate: BlockCoordinate,
        spec: BlockSpec,
        rect: &PixelWindow,
        bands: usize,
        transform: GeoTransform,
        fill_value: f32,
        warped: Option<&WarpedRaster>,
    ) -> Self {
        let (width, height) = (spec.block_width(), spec.block_height());
        let mut data = vec![fill_value; width * height * bands];
        let mut valid = vec![false; width * height];

        if let Some(warped) = warped {
            for row in 0..rect.height.min(warped.height) {
                for col in 0..rect.width.min(warped.width) {
                    let src = row * warped.width + col;
                    let dst = row * width + col;
                    valid[dst] = warped.valid[src];
                    let n = bands.min(warped.bands);
                    data[dst * bands..dst * bands + n]
                        .copy_from_slice(&warped.data[src * warped.bands..src * warped.bands + n]);
                }
            }
        }

        Self {
            time_key,
            coordinate,
            width,
            height,
            bands,
            data,
            valid,
            transform,
        }
    }

    pub fn time_key(&self) -> TimeKey {
        self.time_key
    }

    pub fn coordinate(&self) -> BlockCoordinate {
        self.coordinate
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Pixel-interleaved values, `height * width * bands` long.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Consume the block, returning its values.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Value of `band` at `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize, band: usize) -> Option<f32> {
        if row >= self.height || col >= self.width || band >= self.bands {
            return None;
        }
        Some(self.data[(row * self.width + col) * self.bands + band])
    }

    /// Geotransform of the block's top-left pixel on the reference grid.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Row-major validity of each pixel.
    pub fn valid_mask(&self) -> &[bool] {
        &self.valid
    }

    pub fn is_valid(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && self.valid[row * self.width + col]
    }

    pub fn valid_pixel_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> TimeKey {
        TimeKey::from_ymd(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_assemble_pads_partial_rect() {
        let spec = BlockSpec::new(4, 3).unwrap();
        let rect = PixelWindow::new(8, 6, 2, 1);
        let warped = WarpedRaster {
            width: 2,
            height: 1,
            bands: 2,
            data: vec![1.0, 10.0, 2.0, 20.0],
            valid: vec![true, false],
        };
        let transform = GeoTransform::from_origin(8.0, -6.0, 1.0, 1.0);
        let block = Block::assemble(
            key(),
            BlockCoordinate::new(2, 2),
            spec,
            &rect,
            2,
            transform,
            -1.0,
            Some(&warped),
        );

        assert_eq!((block.width(), block.height(), block.bands()), (4, 3, 2));
        assert_eq!(block.data().len(), 24);
        assert_eq!(block.pixel(0, 0, 1), Some(10.0));
        assert_eq!(block.pixel(0, 1, 0), Some(2.0));
        assert_eq!(block.pixel(2, 3, 0), Some(-1.0));
        assert_eq!(block.pixel(3, 0, 0), None);
        assert!(block.is_valid(0, 0));
        assert!(!block.is_valid(0, 1));
        assert!(!block.is_valid(1, 0));
        assert_eq!(block.valid_pixel_count(), 1);
        assert_eq!(block.transform(), &transform);
    }

    #[test]
    fn test_assemble_without_coverage() {
        let spec = BlockSpec::square(2).unwrap();
        let block = Block::assemble(
            key(),
            BlockCoordinate::new(0, 0),
            spec,
            &PixelWindow::new(0, 0, 2, 2),
            1,
            GeoTransform::from_origin(0.0, 0.0, 1.0, 1.0),
            f32::NAN,
            None,
        );
        assert_eq!(block.valid_pixel_count(), 0);
        assert!(block.data().iter().all(|v| v.is_nan()));
    }
}
