//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic or projected bounding box.
///
/// For geographic CRS (EPSG:4326), coordinates are in degrees.
/// For projected CRS (EPSG:3857, UTM, etc.), coordinates are in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box enclosing every point, or `None` for an empty iterator.
    ///
    /// Non-finite points are ignored.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut bbox: Option<BoundingBox> = None;
        for (x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            bbox = Some(match bbox {
                Some(b) => b.expand_to_include(x, y),
                None => BoundingBox::new(x, y, x, y),
            });
        }
        bbox
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if this bbox intersects another (touching edges do not count).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow the box so that it contains the given point.
    pub fn expand_to_include(&self, x: f64, y: f64) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(x),
            min_y: self.min_y.min(y),
            max_x: self.max_x.max(x),
            max_y: self.max_y.max(y),
        }
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Points along the perimeter, `segments` per edge, corners included.
    ///
    /// Used to transform a box between CRSs where straight edges bend.
    pub fn densified_edges(&self, segments: usize) -> Vec<(f64, f64)> {
        let segments = segments.max(1);
        let mut points = Vec::with_capacity(segments * 4);
        for i in 0..segments {
            let t = i as f64 / segments as f64;
            let x = self.min_x + t * self.width();
            let y = self.min_y + t * self.height();
            points.push((x, self.min_y));
            points.push((self.max_x, y));
            points.push((self.max_x - t * self.width(), self.max_y));
            points.push((self.min_x, self.max_y - t * self.height()));
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));

        let intersection = a.intersection(&b).unwrap();
        assert_eq!(intersection.min_x, 5.0);
        assert_eq!(intersection.min_y, 5.0);
        assert_eq!(intersection.max_x, 10.0);
        assert_eq!(intersection.max_y, 10.0);
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_union() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(-5.0, 5.0, 15.0, 20.0);
        assert_eq!(a.union(&b), BoundingBox::new(-5.0, 0.0, 15.0, 20.0));
    }

    #[test]
    fn test_from_points_skips_non_finite() {
        let bbox = BoundingBox::from_points(vec![
            (1.0, 2.0),
            (f64::NAN, 100.0),
            (-3.0, 4.0),
            (f64::INFINITY, 0.0),
        ])
        .unwrap();
        assert_eq!(bbox, BoundingBox::new(-3.0, 2.0, 1.0, 4.0));
        assert!(BoundingBox::from_points(Vec::new()).is_none());
    }

    #[test]
    fn test_densified_edges_cover_corners() {
        let bbox = BoundingBox::new(0.0, 0.0, 4.0, 2.0);
        let points = bbox.densified_edges(4);
        assert_eq!(points.len(), 16);
        for corner in [(0.0, 0.0), (4.0, 0.0), (4.0, 2.0), (0.0, 2.0)] {
            assert!(points.contains(&corner), "missing corner {:?}", corner);
        }
        assert_eq!(BoundingBox::from_points(points), Some(bbox));
    }
}
