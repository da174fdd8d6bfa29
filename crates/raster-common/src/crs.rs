//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known CRS codes the projection layer knows how to transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees)
    Epsg4326,
    /// NAD83 Geographic
    Epsg4269,
    /// Web Mercator (meters)
    Epsg3857,
    /// WGS84 / UTM zone (EPSG:326zz north, EPSG:327zz south)
    Utm { zone: u8, north: bool },
}

impl CrsCode {
    /// Parse a CRS identifier.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "epsg:32633"
    /// - "CRS:84" (equivalent to EPSG:4326 with lon/lat axis order)
    /// - "EPSG:900913" (legacy Web Mercator alias)
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "EPSG:4326" | "CRS:84" | "OGC:CRS84" => return Ok(CrsCode::Epsg4326),
            "EPSG:4269" => return Ok(CrsCode::Epsg4269),
            "EPSG:3857" | "EPSG:900913" => return Ok(CrsCode::Epsg3857),
            _ => {}
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;

        match code {
            32601..=32660 => Ok(CrsCode::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(CrsCode::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => Err(CrsParseError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Numeric EPSG code.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg4269 => 4269,
            CrsCode::Epsg3857 => 3857,
            CrsCode::Utm { zone, north: true } => 32600 + *zone as u32,
            CrsCode::Utm { zone, north: false } => 32700 + *zone as u32,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Epsg4269)
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// A CRS identifier as carried by raster metadata.
///
/// Rasters may declare CRSs the projection layer cannot transform; those are
/// still comparable by identifier, so two rasters in the same unknown CRS can
/// be aligned without any projection math. Identifiers are normalized
/// (trimmed, upper-cased, aliases folded) so that `epsg:4326` and `CRS:84`
/// compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Crs(String);

impl Crs {
    pub fn new(identifier: impl AsRef<str>) -> Self {
        let raw = identifier.as_ref();
        match CrsCode::parse(raw) {
            Ok(code) => Self(code.to_string()),
            Err(_) => Self(raw.trim().to_uppercase()),
        }
    }

    /// The normalized identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The well-known code, if the projection layer supports this CRS.
    pub fn code(&self) -> Result<CrsCode, CrsParseError> {
        CrsCode::parse(&self.0)
    }
}

impl From<CrsCode> for Crs {
    fn from(code: CrsCode) -> Self {
        Self(code.to_string())
    }
}

impl From<String> for Crs {
    fn from(s: String) -> Self {
        Crs::new(s)
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.0
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(CrsCode::parse("EPSG:4326").unwrap(), CrsCode::Epsg4326);
        assert_eq!(CrsCode::parse("epsg:3857").unwrap(), CrsCode::Epsg3857);
        assert_eq!(CrsCode::parse("CRS:84").unwrap(), CrsCode::Epsg4326);
        assert!(CrsCode::parse("EPSG:99999").is_err());
        assert!(CrsCode::parse("not a crs").is_err());
    }

    #[test]
    fn test_parse_utm() {
        assert_eq!(
            CrsCode::parse("EPSG:32633").unwrap(),
            CrsCode::Utm {
                zone: 33,
                north: true
            }
        );
        assert_eq!(
            CrsCode::parse("EPSG:32750").unwrap(),
            CrsCode::Utm {
                zone: 50,
                north: false
            }
        );
        assert!(CrsCode::parse("EPSG:32661").is_err());
        assert_eq!(CrsCode::parse("EPSG:32750").unwrap().epsg(), 32750);
    }

    #[test]
    fn test_crs_normalization() {
        assert_eq!(Crs::new("epsg:4326"), Crs::new("CRS:84"));
        assert_eq!(Crs::new(" EPSG:900913 ").as_str(), "EPSG:3857");
        assert_eq!(Crs::new("local:grid").as_str(), "LOCAL:GRID");
        assert!(Crs::new("local:grid").code().is_err());
        assert_eq!(Crs::from(CrsCode::Epsg4269).code().unwrap(), CrsCode::Epsg4269);
    }
}
