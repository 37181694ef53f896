//! Analytic reference geometry used by the bundled kernel.
//!
//! Surfaces and curves here are plain values: evaluating, projecting or
//! mirroring them never touches topology. Faces, edges and wires that wrap
//! them live in [`crate::kernel::shape`].

use nalgebra as na;

pub type Point3 = na::Point3<f64>;
pub type Vector3 = na::Vector3<f64>;

pub const EPSILON: f64 = 1e-6;

pub trait ApproxEq {
    fn approx_eq(&self, other: &Self) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).abs() < EPSILON
    }
}

impl ApproxEq for Point3 {
    fn approx_eq(&self, other: &Self) -> bool {
        na::distance_squared(self, other) < EPSILON * EPSILON
    }
}

impl ApproxEq for Vector3 {
    fn approx_eq(&self, other: &Self) -> bool {
        (self - other).norm_squared() < EPSILON * EPSILON
    }
}

pub mod plane;
pub use plane::Plane;

pub mod bbox;
pub use bbox::BoundingBox;

pub mod surface;
pub use surface::{CylindricalSurface, ParamRect, PlaneSurface, RuledSurface, Surface};

pub mod curve;
pub use curve::{Curve, LineCurve, PolylineCurve};

/// True when every coordinate is finite.
pub fn is_finite_point(p: &Point3) -> bool {
    p.coords.iter().all(|c| c.is_finite())
}
