//! Kernel abstraction layer for geometry operations.
//!
//! Everything above this module talks to geometry through [`GeometryKernel`],
//! so the reference and entity layers never depend on a concrete kernel.

pub mod section;
pub mod shape;
mod truck;

#[cfg(test)]
pub(crate) mod mock;


pub use shape::Shape;
pub use truck::TruckKernel;

use crate::geometry::{BoundingBox, ParamRect, Plane, Point3, Vector3};
use std::fmt::Debug;
use thiserror::Error;

/// Errors that can occur during kernel operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelOpError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelOpError>;

/// Abstract interface for the geometry kernel.
///
/// Searches that may legitimately find nothing (projections, nearest shape,
/// bounding boxes) return `Option`; operations that can fail return
/// [`KernelResult`].
pub trait GeometryKernel: Send + Sync {
    /// Parametric two-parameter surface.
    type Surface: Clone + Debug;
    /// Parametric one-parameter curve.
    type Curve: Clone + Debug;
    /// Topological shape: face, edge, wire, solid or compound.
    type Shape: Clone + Debug;

    // === Surfaces ===

    fn surface_bounds(&self, surface: &Self::Surface) -> ParamRect;

    fn surface_eval(&self, surface: &Self::Surface, u: f64, v: f64) -> Point3;

    fn surface_normal(&self, surface: &Self::Surface, u: f64, v: f64) -> Vector3;

    /// Parameters of the nearest point on the surface, within its bounds.
    fn project_point_to_surface(&self, surface: &Self::Surface, point: &Point3) -> Option<(f64, f64)>;

    fn mirror_surface(&self, surface: &Self::Surface, plane: &Plane) -> Self::Surface;

    /// An unbounded planar surface.
    fn plane_surface(&self, plane: &Plane) -> Self::Surface;

    // === Curves ===

    fn curve_bounds(&self, curve: &Self::Curve) -> (f64, f64);

    fn curve_eval(&self, curve: &Self::Curve, u: f64) -> Point3;

    fn project_point_to_curve(&self, curve: &Self::Curve, point: &Point3) -> Option<f64>;

    /// Reverse the curve in place.
    fn reverse_curve(&self, curve: &mut Self::Curve);

    /// Parameter, on the reversed curve, of the point at `u` on `curve`.
    fn reversed_parameter(&self, curve: &Self::Curve, u: f64) -> f64;

    fn trim_curve(&self, curve: &Self::Curve, u1: f64, u2: f64) -> KernelResult<Self::Curve>;

    fn mirror_curve(&self, curve: &Self::Curve, plane: &Plane) -> Self::Curve;

    // === Shapes ===

    fn face_from_surface(&self, surface: &Self::Surface) -> Self::Shape;

    fn edge_from_curve(&self, curve: &Self::Curve) -> Self::Shape;

    /// Underlying surface of a face (or of the faces of a divided face).
    fn surface_of_face(&self, shape: &Self::Shape) -> Option<Self::Surface>;

    /// Divide faces that close on themselves at their seam.
    fn divide_closed(&self, shape: &Self::Shape) -> Self::Shape;

    /// Divide faces at C0 discontinuities of their surface.
    fn divide_c0(&self, shape: &Self::Shape) -> Self::Shape;

    /// Section of two shapes, as a compound of edges.
    fn intersect(&self, a: &Self::Shape, b: &Self::Shape, approximate: bool) -> KernelResult<Self::Shape>;

    fn edges(&self, shape: &Self::Shape) -> Vec<Self::Shape>;

    /// Group edges into wires of connected edges, in discovery order.
    fn wires_from_edges(&self, edges: &[Self::Shape]) -> Vec<Self::Shape>;

    /// A single curve running along the whole wire.
    fn wire_curve(&self, wire: &Self::Shape) -> KernelResult<Self::Curve>;

    /// Index of the shape nearest to `point`. Equidistant shapes resolve to
    /// the earliest one.
    fn nearest_shape(&self, point: &Point3, shapes: &[Self::Shape]) -> Option<usize>;

    fn mirror_shape(&self, shape: &Self::Shape, plane: &Plane) -> KernelResult<Self::Shape>;

    fn bounding_box(&self, shape: &Self::Shape) -> Option<BoundingBox>;

    fn is_valid(&self, shape: &Self::Shape) -> bool;

    // === Boolean Operations ===

    /// Union of two shapes (A ∪ B).
    fn fuse(&self, a: &Self::Shape, b: &Self::Shape) -> KernelResult<Self::Shape>;

    /// Difference of two shapes (A - B).
    fn cut(&self, a: &Self::Shape, b: &Self::Shape) -> KernelResult<Self::Shape>;

    /// Pieces of `shape` on both sides of `tool`.
    fn split(&self, shape: &Self::Shape, tool: &Self::Shape) -> KernelResult<Self::Shape>;

    /// Merge coplanar / co-surface pieces left behind by booleans.
    fn unify(&self, shape: &Self::Shape) -> KernelResult<Self::Shape>;
}

/// Get the default kernel implementation.
pub fn default_kernel() -> TruckKernel {
    TruckKernel::new()
}
