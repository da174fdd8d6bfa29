//! Spherical Web Mercator (EPSG:3857).

use std::f64::consts::PI;

use crate::WGS84_SEMI_MAJOR;

/// Latitude limit where Web Mercator becomes square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Web Mercator projection on the WGS84 sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WebMercator;

impl WebMercator {
    /// Half the width of the projected world (meters).
    pub const HALF_EXTENT: f64 = PI * WGS84_SEMI_MAJOR;

    /// lon/lat degrees → meters. `None` beyond ±[`MAX_LATITUDE`].
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > MAX_LATITUDE {
            return None;
        }
        let x = WGS84_SEMI_MAJOR * lon.to_radians();
        let y = WGS84_SEMI_MAJOR * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
        Some((x, y))
    }

    /// meters → lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let lon = (x / WGS84_SEMI_MAJOR).to_degrees();
        let lat = (2.0 * (y / WGS84_SEMI_MAJOR).exp().atan() - PI / 2.0).to_degrees();
        Some((lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_world_extent() {
        let (x, y) = WebMercator.forward(180.0, MAX_LATITUDE).unwrap();
        assert_approx_eq!(x, 20037508.342789244, 1e-6);
        assert_approx_eq!(y, 20037508.342789244, 1e-2);
    }

    #[test]
    fn test_polar_latitudes_are_outside_domain() {
        assert!(WebMercator.forward(0.0, 89.5).is_none());
        assert!(WebMercator.forward(0.0, -85.06).is_none());
        assert!(WebMercator.forward(0.0, -MAX_LATITUDE).is_some());
    }

    #[test]
    fn test_origin() {
        assert_eq!(WebMercator.forward(0.0, 0.0), Some((0.0, 0.0)));
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = WebMercator.forward(-97.5, 38.5).unwrap();
        let (lon, lat) = WebMercator.inverse(x, y).unwrap();
        assert_approx_eq!(lon, -97.5, 1e-9);
        assert_approx_eq!(lat, 38.5, 1e-9);
    }
}
