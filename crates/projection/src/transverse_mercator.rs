//! Ellipsoidal Transverse Mercator, parameterized for UTM zones.
//!
//! Series expansions after Snyder, "Map Projections: A Working Manual"
//! (USGS PP 1395), pp. 61-64. Accuracy is at the millimeter level within a
//! zone and degrades slowly away from the central meridian.

use crate::{ProjectionError, WGS84_INVERSE_FLATTENING, WGS84_SEMI_MAJOR};

/// UTM scale factor on the central meridian.
pub const UTM_SCALE_FACTOR: f64 = 0.9996;

const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Longitudes further than this from the central meridian are rejected;
/// the series diverges well before the antipodal meridian.
const MAX_MERIDIAN_OFFSET_DEG: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    /// Semi-major axis (meters)
    pub a: f64,
    /// First eccentricity squared
    pub e2: f64,
    /// Central meridian (degrees)
    pub lon0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    /// False easting (meters)
    pub false_easting: f64,
    /// False northing (meters)
    pub false_northing: f64,
}

impl TransverseMercator {
    /// WGS84 / UTM zone projection.
    pub fn utm(zone: u8, north: bool) -> Result<Self, ProjectionError> {
        if !(1..=60).contains(&zone) {
            return Err(ProjectionError::InvalidParameters(format!(
                "UTM zone {} is outside 1-60",
                zone
            )));
        }
        let f = 1.0 / WGS84_INVERSE_FLATTENING;
        Ok(Self {
            a: WGS84_SEMI_MAJOR,
            e2: f * (2.0 - f),
            lon0: (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
            k0: UTM_SCALE_FACTOR,
            false_easting: UTM_FALSE_EASTING,
            false_northing: if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH },
        })
    }

    fn ep2(&self) -> f64 {
        self.e2 / (1.0 - self.e2)
    }

    /// Meridian arc length from the equator to `phi` (radians).
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// lon/lat degrees → easting/northing meters.
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() > 90.0 {
            return None;
        }
        let mut dlon = lon - self.lon0;
        while dlon > 180.0 {
            dlon -= 360.0;
        }
        while dlon < -180.0 {
            dlon += 360.0;
        }
        if dlon.abs() > MAX_MERIDIAN_OFFSET_DEG {
            return None;
        }

        let phi = lat.to_radians();
        let ep2 = self.ep2();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = self.a / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlon.to_radians();
        let m = self.meridian_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
            + self.false_easting;
        let y = self.k0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0))
            + self.false_northing;

        Some((x, y))
    }

    /// easting/northing meters → lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = self.ep2();

        let x = x - self.false_easting;
        let m = (y - self.false_northing) / self.k0;
        let mu = m / (self.a * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let sqrt_1me2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1me2) / (1.0 + sqrt_1me2);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let (sin_phi1, cos_phi1) = phi1.sin_cos();
        if cos_phi1.abs() < 1e-12 {
            return None;
        }
        let tan_phi1 = phi1.tan();
        let w = 1.0 - e2 * sin_phi1 * sin_phi1;
        let n1 = self.a / w.sqrt();
        let t1 = tan_phi1 * tan_phi1;
        let c1 = ep2 * cos_phi1 * cos_phi1;
        let r1 = self.a * (1.0 - e2) / w.powf(1.5);
        let d = x / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);
        let lambda = (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d5
                / 120.0)
            / cos_phi1;

        let lat = phi.to_degrees();
        let lon = self.lon0 + lambda.to_degrees();
        if lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 {
            Some((lon, lat))
        } else {
            None
        }
    }
}
