//! Test data generators for creating synthetic raster data.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read/written correctly
/// by checking that grid[row][col] == col * 1000 + row.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
///
/// # Returns
///
/// A `Vec<f32>` in row-major order (row 0 first, then row 1, etc.)
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50); // 10 * 5
/// assert_eq!(grid[0], 0.0);   // col=0, row=0 -> 0*1000 + 0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0 -> 1*1000 + 0
/// assert_eq!(grid[10], 1.0);  // col=0, row=1 -> 0*1000 + 1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(test_grid_value(col, row));
        }
    }
    data
}

/// The value [`create_test_grid`] stores at `(col, row)`.
pub fn test_grid_value(col: usize, row: usize) -> f32 {
    (col * 1000 + row) as f32
}

/// Creates a band-major stack of test grids.
///
/// Band `b` holds `b * 1_000_000 + col * 1000 + row`, so every value
/// identifies its band, column and row.
///
/// # Returns
///
/// A `Vec<f32>` of `bands` consecutive row-major planes.
pub fn create_band_stack(width: usize, height: usize, bands: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height * bands);
    for band in 0..bands {
        for row in 0..height {
            for col in 0..width {
                data.push(band_stack_value(col, row, band));
            }
        }
    }
    data
}

/// The value [`create_band_stack`] stores at `(col, row, band)`.
pub fn band_stack_value(col: usize, row: usize, band: usize) -> f32 {
    (band * 1_000_000 + col * 1000 + row) as f32
}

/// Creates a grid filled with a constant value.
///
/// Useful for testing edge cases and simple scenarios.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Creates a grid with NaN values at specified positions.
///
/// Useful for testing missing data handling.
///
/// # Arguments
///
/// * `width` - Number of columns
/// * `height` - Number of rows
/// * `nan_positions` - List of (col, row) positions that should be NaN
///
/// # Returns
///
/// A `Vec<f32>` with NaN at specified positions, zeros elsewhere.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![0.0f32; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}

/// Creates a grid whose value is a linear function of position.
///
/// `value = a + b * x + c * y` where `x`, `y` are pixel centres
/// (`col + 0.5`, `row + 0.5`). Linear fields are reproduced exactly by
/// bilinear interpolation, which makes them useful for resampling tests.
pub fn create_linear_grid(width: usize, height: usize, a: f32, b: f32, c: f32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(a + b * (col as f32 + 0.5) + c * (row as f32 + 0.5));
        }
    }
    data
}
