//! Point and bounds transforms between two supported CRSs.

use raster_common::{BoundingBox, Crs, CrsCode};

use crate::mercator::MAX_LATITUDE;
use crate::{Geographic, ProjectionError, TransverseMercator, WebMercator};

/// A projection for one [`CrsCode`], mapping lon/lat degrees to CRS units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Geographic(Geographic),
    WebMercator(WebMercator),
    TransverseMercator(TransverseMercator),
}

impl Projection {
    pub fn for_code(code: CrsCode) -> Result<Self, ProjectionError> {
        Ok(match code {
            CrsCode::Epsg4326 | CrsCode::Epsg4269 => Projection::Geographic(Geographic),
            CrsCode::Epsg3857 => Projection::WebMercator(WebMercator),
            CrsCode::Utm { zone, north } => {
                Projection::TransverseMercator(TransverseMercator::utm(zone, north)?)
            }
        })
    }

    /// lon/lat degrees → CRS coordinates.
    pub fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        match self {
            Projection::Geographic(p) => p.forward(lon, lat),
            Projection::WebMercator(p) => p.forward(lon, lat),
            Projection::TransverseMercator(p) => p.forward(lon, lat),
        }
    }

    /// CRS coordinates → lon/lat degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        match self {
            Projection::Geographic(p) => p.inverse(x, y),
            Projection::WebMercator(p) => p.inverse(x, y),
            Projection::TransverseMercator(p) => p.inverse(x, y),
        }
    }

    /// Pull a lon/lat point onto the projection's domain edge.
    fn clamp_to_domain(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::WebMercator(_) => (lon, lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)),
            _ => (lon, lat),
        }
    }
}

/// Transform from one CRS to another, pivoting through lon/lat.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsTransform {
    source: CrsCode,
    target: CrsCode,
    from: Projection,
    to: Projection,
}

impl CrsTransform {
    /// Build a transform between two CRS identifiers.
    ///
    /// Fails with [`ProjectionError::UnsupportedCrs`] if either side is not a
    /// CRS this crate implements.
    pub fn new(source: &Crs, target: &Crs) -> Result<Self, ProjectionError> {
        Self::from_codes(source.code()?, target.code()?)
    }

    pub fn from_codes(source: CrsCode, target: CrsCode) -> Result<Self, ProjectionError> {
        Ok(Self {
            source,
            target,
            from: Projection::for_code(source)?,
            to: Projection::for_code(target)?,
        })
    }

    pub fn source(&self) -> CrsCode {
        self.source
    }

    pub fn target(&self) -> CrsCode {
        self.target
    }

    /// True when coordinates pass through unchanged.
    pub fn is_identity(&self) -> bool {
        self.source == self.target || (self.source.is_geographic() && self.target.is_geographic())
    }

    /// The reverse transform.
    pub fn inverse(&self) -> CrsTransform {
        CrsTransform {
            source: self.target,
            target: self.source,
            from: self.to,
            to: self.from,
        }
    }

    /// Transform a point; `None` if it falls outside either projection's domain.
    pub fn transform(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.is_identity() {
            return if x.is_finite() && y.is_finite() {
                Some((x, y))
            } else {
                None
            };
        }
        let (lon, lat) = self.from.inverse(x, y)?;
        self.to.forward(lon, lat)
    }

    /// Transform a bounding box by densifying its edges.
    ///
    /// `segments` points are sampled per edge; the result encloses every
    /// transformable sample. Samples past a target domain edge (the Web
    /// Mercator latitude limit) are clamped onto it rather than dropped.
    /// Returns `None` if no sample transforms.
    pub fn transform_bounds(&self, bbox: &BoundingBox, segments: usize) -> Option<BoundingBox> {
        if self.is_identity() {
            return Some(*bbox);
        }
        BoundingBox::from_points(bbox.densified_edges(segments).into_iter().filter_map(
            |(x, y)| {
                let (lon, lat) = self.from.inverse(x, y)?;
                let (lon, lat) = self.to.clamp_to_domain(lon, lat);
                self.to.forward(lon, lat)
            },
        ))
    }
}
