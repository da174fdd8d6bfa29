//! Mapping reference-grid pixels onto each source's native pixels.
//!
//! A plan is built once per source at `init()` and answers, for any pixel
//! rectangle of the reference grid, which source window must be decoded and
//! where every destination pixel samples it.
//!
//! ```text
//! reference pixel centre ──► reference CRS ──► [reproject] ──► source CRS ──► source pixel
//!        (col + 0.5, row + 0.5)        affine            CrsTransform          inverse affine
//! ```
//!
//! When both grids share a CRS the three steps collapse into one composite
//! affine, computed up front.

use projection::{CrsTransform, ProjectionError};
use raster_common::{Crs, GeoTransform, TimeKey};
use raster_io::{PixelWindow, RasterMetadata, ResamplingMethod, WarpRequest};
use thiserror::Error;

use crate::types::ReferenceGrid;

/// Why a source cannot be aligned to the reference grid.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The CRSs differ and at least one is unknown to the projection layer.
    #[error("cannot relate {source_crs} to {reference_crs}: {cause}")]
    UnsupportedCrs {
        source_crs: Crs,
        reference_crs: Crs,
        #[source]
        cause: ProjectionError,
    },

    /// A transform has zero pixel size or is otherwise not invertible.
    #[error("degenerate {which} transform {transform:?}")]
    DegenerateTransform {
        which: &'static str,
        transform: [f64; 6],
    },
}

/// How reference coordinates reach source pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentMode {
    /// Same CRS: one affine from reference pixels to source pixels.
    Resample { reference_to_source: GeoTransform },
    /// Different CRS: reference pixel → reference CRS → source CRS → source pixel.
    Reproject {
        reference_transform: GeoTransform,
        to_source: CrsTransform,
        source_inverse: GeoTransform,
    },
}

/// Alignment of one source onto the reference grid.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentPlan {
    time_key: TimeKey,
    source_width: usize,
    source_height: usize,
    mode: AlignmentMode,
    method: ResamplingMethod,
}

/// What a destination rectangle needs from a source.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowResolution {
    /// No destination pixel lands inside the source; nothing to read.
    OutsideSource,
    /// Read and resample this request.
    Read(WarpRequest),
}

/// Build the plan aligning `source` to `reference`.
///
/// Identical CRS identifiers never involve the projection layer, so two
/// rasters in the same unknown CRS still align.
pub fn build_plan(
    time_key: TimeKey,
    source: &RasterMetadata,
    reference: &ReferenceGrid,
    method: ResamplingMethod,
) -> Result<AlignmentPlan, PlanError> {
    let source_inverse = source
        .transform
        .inverse()
        .ok_or(PlanError::DegenerateTransform {
            which: "source",
            transform: source.transform.to_gdal(),
        })?;
    if reference.transform.is_degenerate() {
        return Err(PlanError::DegenerateTransform {
            which: "reference",
            transform: reference.transform.to_gdal(),
        });
    }

    let mode = if source.crs == reference.crs {
        AlignmentMode::Resample {
            reference_to_source: source_inverse.then_after(&reference.transform),
        }
    } else {
        let to_source = CrsTransform::new(&reference.crs, &source.crs).map_err(|cause| {
            PlanError::UnsupportedCrs {
                source_crs: source.crs.clone(),
                reference_crs: reference.crs.clone(),
                cause,
            }
        })?;
        AlignmentMode::Reproject {
            reference_transform: reference.transform,
            to_source,
            source_inverse,
        }
    };

    tracing::debug!(
        time_key = %time_key,
        source_crs = %source.crs,
        reference_crs = %reference.crs,
        reproject = matches!(mode, AlignmentMode::Reproject { .. }),
        method = %method,
        "Built alignment plan"
    );

    Ok(AlignmentPlan {
        time_key,
        source_width: source.width,
        source_height: source.height,
        mode,
        method,
    })
}

impl AlignmentPlan {
    pub fn time_key(&self) -> TimeKey {
        self.time_key
    }

    pub fn mode(&self) -> &AlignmentMode {
        &self.mode
    }

    pub fn method(&self) -> ResamplingMethod {
        self.method
    }

    /// True when the source must be reprojected rather than just resampled.
    pub fn is_reprojection(&self) -> bool {
        matches!(self.mode, AlignmentMode::Reproject { .. })
    }

    /// Map a continuous reference pixel coordinate to a continuous source
    /// pixel coordinate. `None` if it has no image in the source CRS.
    pub fn map_pixel(&self, col: f64, row: f64) -> Option<(f64, f64)> {
        match &self.mode {
            AlignmentMode::Resample {
                reference_to_source,
            } => Some(reference_to_source.pixel_to_world(col, row)),
            AlignmentMode::Reproject {
                reference_transform,
                to_source,
                source_inverse,
            } => {
                let (x, y) = reference_transform.pixel_to_world(col, row);
                let (sx, sy) = to_source.transform(x, y)?;
                Some(source_inverse.pixel_to_world(sx, sy))
            }
        }
    }

    /// Work out what the reference rectangle `rect` needs from the source.
    ///
    /// Each destination pixel samples the source at the image of its centre.
    /// The read window spans every in-extent sample, padded by the
    /// resampling kernel radius and clipped to the source.
    pub fn resolve_window(&self, rect: &PixelWindow, fill_value: f32) -> WindowResolution {
        let (src_w, src_h) = (self.source_width as f64, self.source_height as f64);
        let mut coords = Vec::with_capacity(rect.len());
        let mut span: Option<(f64, f64, f64, f64)> = None;

        for row in rect.row_off..rect.row_end() {
            for col in rect.col_off..rect.col_end() {
                let Some((u, v)) = self.map_pixel(col as f64 + 0.5, row as f64 + 0.5) else {
                    coords.push([f64::NAN, f64::NAN]);
                    continue;
                };
                coords.push([u, v]);
                if u >= 0.0 && u < src_w && v >= 0.0 && v < src_h {
                    span = Some(match span {
                        None => (u, u, v, v),
                        Some((u0, u1, v0, v1)) => (u0.min(u), u1.max(u), v0.min(v), v1.max(v)),
                    });
                }
            }
        }

        let Some((u_min, u_max, v_min, v_max)) = span else {
            return WindowResolution::OutsideSource;
        };

        let radius = self.method.kernel_radius();
        let (col_start, col_end) = padded_range(u_min, u_max, radius, self.source_width);
        let (row_start, row_end) = padded_range(v_min, v_max, radius, self.source_height);

        WindowResolution::Read(WarpRequest {
            source_window: PixelWindow::new(
                col_start,
                row_start,
                col_end - col_start,
                row_end - row_start,
            ),
            width: rect.width,
            height: rect.height,
            coords,
            method: self.method,
            fill_value,
        })
    }
}

/// Pixel index range `[start, end)` covering samples in `[lo, hi]`, widened
/// by `radius` and clipped to `[0, len)`.
fn padded_range(lo: f64, hi: f64, radius: usize, len: usize) -> (usize, usize) {
    let start = (lo.floor() as usize).saturating_sub(radius);
    let end = (hi.floor() as usize + 1 + radius).min(len);
    (start, end)
}
