//! Geographic (lon/lat) coordinates.
//!
//! NAD83 and WGS84 differ by well under a meter; both are treated as the same
//! datum here.

/// Plate carrée lon/lat in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geographic;

impl Geographic {
    /// Validate a lon/lat pair; longitudes are not wrapped.
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if lon.is_finite() && lat.is_finite() && (-90.0..=90.0).contains(&lat) {
            Some((lon, lat))
        } else {
            None
        }
    }

    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        self.forward(x, y)
    }
}
