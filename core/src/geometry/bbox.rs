use super::Point3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    pub fn from_point(p: Point3) -> Self {
        Self { min: p, max: p }
    }

    /// Box around all points, or `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = Point3>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bbox = Self::from_point(iter.next()?);
        for p in iter {
            bbox.add_point(&p);
        }
        Some(bbox)
    }

    pub fn add_point(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        self.add_point(&other.min);
        self.add_point(&other.max);
    }

    /// Grow the box symmetrically by `tol` on every side.
    pub fn enlarge(&mut self, tol: f64) {
        let t = tol.abs();
        self.min -= nalgebra::Vector3::repeat(t);
        self.max += nalgebra::Vector3::repeat(t);
    }

    pub fn diagonal(&self) -> f64 {
        (self.max - self.min).norm()
    }

    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn contains(&self, p: &Point3) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }
}
