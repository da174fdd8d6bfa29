//! Sampling a decoded source window onto a destination grid.

use crate::error::Result;
use crate::interpolation;
use crate::types::{RasterMetadata, WarpRequest, WarpedRaster};
use crate::RasterIoError;

/// Resample `window_data` (band-major over `request.source_window`) into the
/// destination grid described by `request`.
///
/// A destination pixel is valid only if its sample coordinate falls inside
/// the source extent and every band yields a valid sample there.
pub fn warp(
    metadata: &RasterMetadata,
    window_data: &[f32],
    request: &WarpRequest,
) -> Result<WarpedRaster> {
    request.validate()?;

    let window = request.source_window;
    let plane_len = window.len();
    let bands = metadata.bands;
    if window_data.len() != plane_len * bands {
        return Err(RasterIoError::InvalidRequest(format!(
            "window data holds {} values, expected {} ({} bands over {})",
            window_data.len(),
            plane_len * bands,
            bands,
            window
        )));
    }

    let mut out = WarpedRaster::filled(request.width, request.height, bands, request.fill_value);
    let (src_w, src_h) = (metadata.width as f64, metadata.height as f64);
    let mut samples = vec![0.0f32; bands];

    for (idx, &[u, v]) in request.coords.iter().enumerate() {
        if !(u >= 0.0 && u < src_w && v >= 0.0 && v < src_h) {
            continue;
        }
        let local_x = u - window.col_off as f64;
        let local_y = v - window.row_off as f64;

        let mut all_valid = true;
        for (band, sample) in samples.iter_mut().enumerate() {
            let plane = &window_data[band * plane_len..(band + 1) * plane_len];
            match interpolation::sample(
                request.method,
                plane,
                window.width,
                window.height,
                local_x,
                local_y,
                metadata.nodata,
            ) {
                Some(value) => *sample = value,
                None => {
                    all_valid = false;
                    break;
                }
            }
        }

        if all_valid {
            out.data[idx * bands..(idx + 1) * bands].copy_from_slice(&samples);
            out.valid[idx] = true;
        }
    }

    Ok(out)
}
