//! Interpolation methods for sampling a single band.
//!
//! Coordinates are continuous pixel coordinates local to `data`: pixel
//! `(i, j)` covers `[i, i + 1) × [j, j + 1)` and its centre is
//! `(i + 0.5, j + 0.5)`. Every function returns `None` when no valid sample
//! exists; `nodata` values and NaN are never blended into a result.

use crate::types::ResamplingMethod;

#[inline]
fn is_valid(value: f32, nodata: Option<f32>) -> bool {
    !value.is_nan() && nodata.map_or(true, |nd| value != nd)
}

#[inline]
fn clamp_index(i: i64, len: usize) -> usize {
    i.clamp(0, len as i64 - 1) as usize
}

/// Nearest neighbor interpolation.
///
/// Returns the value of the pixel containing `(x, y)`.
pub fn nearest_interpolate(
    data: &[f32],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    nodata: Option<f32>,
) -> Option<f32> {
    if !(x >= 0.0 && y >= 0.0) {
        return None;
    }
    let col = x.floor() as usize;
    let row = y.floor() as usize;

    if col >= width || row >= height {
        return None;
    }

    let value = data[row * width + col];
    is_valid(value, nodata).then_some(value)
}

/// Bilinear interpolation.
///
/// Interpolates between the four pixel centres surrounding `(x, y)`. Falls
/// back to nearest neighbor if any of them is nodata.
pub fn bilinear_interpolate(
    data: &[f32],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    nodata: Option<f32>,
) -> Option<f32> {
    if width == 0 || height == 0 || !x.is_finite() || !y.is_finite() {
        return None;
    }

    let fx = x - 0.5;
    let fy = y - 0.5;
    let x0f = fx.floor();
    let y0f = fy.floor();
    let xf = (fx - x0f) as f32;
    let yf = (fy - y0f) as f32;

    let x0 = clamp_index(x0f as i64, width);
    let x1 = clamp_index(x0f as i64 + 1, width);
    let y0 = clamp_index(y0f as i64, height);
    let y1 = clamp_index(y0f as i64 + 1, height);

    let v00 = data[y0 * width + x0];
    let v10 = data[y0 * width + x1];
    let v01 = data[y1 * width + x0];
    let v11 = data[y1 * width + x1];

    if ![v00, v10, v01, v11].iter().all(|v| is_valid(*v, nodata)) {
        return nearest_interpolate(data, width, height, x, y, nodata);
    }

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    Some(top * (1.0 - yf) + bottom * yf)
}

/// Bicubic interpolation.
///
/// Uses the 16 surrounding pixel centres. Falls back to bilinear if any of
/// them is nodata.
pub fn cubic_interpolate(
    data: &[f32],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    nodata: Option<f32>,
) -> Option<f32> {
    if width == 0 || height == 0 || !x.is_finite() || !y.is_finite() {
        return None;
    }

    let fx = x - 0.5;
    let fy = y - 0.5;
    let xi = fx.floor() as i64;
    let yi = fy.floor() as i64;
    let xf = (fx - xi as f64) as f32;
    let yf = (fy - yi as f64) as f32;

    let mut values = [[0.0f32; 4]; 4];
    for (j, row) in values.iter_mut().enumerate() {
        let py = clamp_index(yi + j as i64 - 1, height);
        for (i, value) in row.iter_mut().enumerate() {
            let px = clamp_index(xi + i as i64 - 1, width);
            *value = data[py * width + px];
            if !is_valid(*value, nodata) {
                return bilinear_interpolate(data, width, height, x, y, nodata);
            }
        }
    }

    let mut row_values = [0.0f32; 4];
    for (j, row) in values.iter().enumerate() {
        row_values[j] = cubic_1d(row[0], row[1], row[2], row[3], xf);
    }

    Some(cubic_1d(
        row_values[0],
        row_values[1],
        row_values[2],
        row_values[3],
        yf,
    ))
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn cubic_1d(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

/// Sample one band at `(x, y)` with the given method.
pub fn sample(
    method: ResamplingMethod,
    data: &[f32],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
    nodata: Option<f32>,
) -> Option<f32> {
    match method {
        ResamplingMethod::Nearest => nearest_interpolate(data, width, height, x, y, nodata),
        ResamplingMethod::Bilinear => bilinear_interpolate(data, width, height, x, y, nodata),
        ResamplingMethod::Cubic => cubic_interpolate(data, width, height, x, y, nodata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_nearest_interpolate() {
        #[rustfmt::skip]
        let data: Vec<f32> = vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0,
        ];

        assert_eq!(nearest_interpolate(&data, 3, 3, 0.5, 0.5, None), Some(1.0));
        assert_eq!(nearest_interpolate(&data, 3, 3, 1.5, 1.5, None), Some(5.0));
        assert_eq!(nearest_interpolate(&data, 3, 3, 0.99, 0.2, None), Some(1.0));
        assert_eq!(nearest_interpolate(&data, 3, 3, 2.999, 2.0, None), Some(9.0));
        assert_eq!(nearest_interpolate(&data, 3, 3, 3.0, 0.5, None), None);
        assert_eq!(nearest_interpolate(&data, 3, 3, -0.1, 0.5, None), None);
        assert_eq!(nearest_interpolate(&data, 3, 3, f64::NAN, 0.5, None), None);
    }

    #[test]
    fn test_nearest_respects_nodata() {
        let data = vec![1.0, -9999.0, f32::NAN, 4.0];
        assert_eq!(nearest_interpolate(&data, 2, 2, 1.5, 0.5, Some(-9999.0)), None);
        assert_eq!(nearest_interpolate(&data, 2, 2, 0.5, 1.5, None), None);
        assert_eq!(nearest_interpolate(&data, 2, 2, 1.5, 1.5, Some(-9999.0)), Some(4.0));
    }

    #[test]
    fn test_bilinear_interpolate() {
        #[rustfmt::skip]
        let data: Vec<f32> = vec![
            1.0, 2.0,
            3.0, 4.0,
        ];

        // Pixel centres are exact
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.5, 0.5, None), Some(1.0));
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.5, 0.5, None), Some(2.0));
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.5, 1.5, None), Some(3.0));
        assert_eq!(bilinear_interpolate(&data, 2, 2, 1.5, 1.5, None), Some(4.0));

        // Centre of the four
        let v = bilinear_interpolate(&data, 2, 2, 1.0, 1.0, None).unwrap();
        assert_approx_eq!(v, 2.5, 1e-6);

        // Edges clamp
        assert_eq!(bilinear_interpolate(&data, 2, 2, 0.1, 0.1, None), Some(1.0));
    }

    #[test]
    fn test_bilinear_falls_back_to_nearest_on_nodata() {
        let data = vec![1.0, 2.0, 3.0, -1.0];
        let v = bilinear_interpolate(&data, 2, 2, 0.9, 0.9, Some(-1.0));
        assert_eq!(v, Some(1.0));
        let v = bilinear_interpolate(&data, 2, 2, 1.1, 1.1, Some(-1.0));
        assert_eq!(v, None);
    }

    #[test]
    fn test_cubic_interpolate() {
        // Linear ramp is reproduced exactly by Catmull-Rom
        let data: Vec<f32> = (0..16).map(|i| (i % 4) as f32).collect();
        let v = cubic_interpolate(&data, 4, 4, 2.0, 2.0, None).unwrap();
        assert_approx_eq!(v, 1.5, 1e-5);
        let v = cubic_interpolate(&data, 4, 4, 1.5, 1.5, None).unwrap();
        assert_approx_eq!(v, 1.0, 1e-6);
    }

    #[test]
    fn test_cubic_falls_back_on_nodata() {
        let mut data: Vec<f32> = vec![5.0; 16];
        data[0] = f32::NAN;
        let v = cubic_interpolate(&data, 4, 4, 2.0, 2.0, None).unwrap();
        assert_approx_eq!(v, 5.0, 1e-6);
    }
}
