//! Reference geometry attached to bodies and parts.
//!
//! A reference surface (or curve) is the parametrization an entity is laid
//! out against: spars and ribs are located by `(u, v)` on a wing reference
//! surface, frames by `u` along a fuselage reference curve. Each reference
//! keeps a derived kernel shape used for sections and distance queries.

mod extract;

#[cfg(test)]
mod tests_extract;

use crate::error::{ModelError, ModelResult};
use crate::geometry::{ParamRect, Plane, Point3, Vector3};
use crate::kernel::GeometryKernel;
use serde::{Deserialize, Serialize};

/// Geometry accepted where a reference or a shape is expected.
#[derive(Debug, Clone)]
pub enum Geometry<K: GeometryKernel> {
    Surface(K::Surface),
    Curve(K::Curve),
    Shape(K::Shape),
}

impl<K: GeometryKernel> Geometry<K> {
    pub fn family(&self) -> &'static str {
        match self {
            Geometry::Surface(_) => "surface",
            Geometry::Curve(_) => "curve",
            Geometry::Shape(_) => "shape",
        }
    }

    /// Kernel shape for this geometry: a face for a surface, an edge for a
    /// curve, the shape itself otherwise.
    pub fn to_shape(&self, kernel: &K) -> K::Shape {
        match self {
            Geometry::Surface(s) => kernel.face_from_surface(s),
            Geometry::Curve(c) => kernel.edge_from_curve(c),
            Geometry::Shape(s) => s.clone(),
        }
    }

    pub fn into_shape(self, kernel: &K) -> K::Shape {
        match self {
            Geometry::Shape(s) => s,
            other => other.to_shape(kernel),
        }
    }

    pub fn into_surface(self) -> ModelResult<K::Surface> {
        match self {
            Geometry::Surface(s) => Ok(s),
            other => Err(ModelError::UnsupportedGeometryType {
                expected: "surface",
                found: other.family(),
            }),
        }
    }

    pub fn into_curve(self) -> ModelResult<K::Curve> {
        match self {
            Geometry::Curve(c) => Ok(c),
            other => Err(ModelError::UnsupportedGeometryType {
                expected: "curve",
                found: other.family(),
            }),
        }
    }
}

/// How the derived shape of a reference surface is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrefOptions {
    /// Split faces that close on themselves at their seam.
    pub divide_closed: bool,
    /// Split faces at C0 discontinuities.
    pub divide_c0: bool,
}

impl Default for SrefOptions {
    fn default() -> Self {
        Self {
            divide_closed: true,
            divide_c0: true,
        }
    }
}

/// A two-parameter reference surface and its derived face.
#[derive(Debug, Clone)]
pub struct ReferenceSurface<K: GeometryKernel> {
    surface: K::Surface,
    bounds: ParamRect,
    shape: K::Shape,
    options: SrefOptions,
}

impl<K: GeometryKernel> ReferenceSurface<K> {
    pub fn new(kernel: &K, surface: K::Surface, options: SrefOptions) -> Self {
        let bounds = kernel.surface_bounds(&surface);
        let shape = derive_face(kernel, &surface, options);
        Self {
            surface,
            bounds,
            shape,
            options,
        }
    }

    /// Accepts [`Geometry::Surface`] only.
    pub fn from_geometry(kernel: &K, geometry: Geometry<K>, options: SrefOptions) -> ModelResult<Self> {
        Ok(Self::new(kernel, geometry.into_surface()?, options))
    }

    /// Replace the surface; bounds and the derived shape are rebuilt.
    pub fn set_surface(&mut self, kernel: &K, surface: K::Surface) {
        *self = Self::new(kernel, surface, self.options);
    }

    pub fn surface(&self) -> &K::Surface {
        &self.surface
    }

    pub fn shape(&self) -> &K::Shape {
        &self.shape
    }

    pub fn options(&self) -> SrefOptions {
        self.options
    }

    pub fn bounds(&self) -> ParamRect {
        self.bounds
    }

    pub fn u1(&self) -> f64 {
        self.bounds.u1
    }

    pub fn u2(&self) -> f64 {
        self.bounds.u2
    }

    pub fn v1(&self) -> f64 {
        self.bounds.v1
    }

    pub fn v2(&self) -> f64 {
        self.bounds.v2
    }

    pub fn evaluate(&self, kernel: &K, u: f64, v: f64) -> Point3 {
        kernel.surface_eval(&self.surface, u, v)
    }

    pub fn normal(&self, kernel: &K, u: f64, v: f64) -> Vector3 {
        kernel.surface_normal(&self.surface, u, v)
    }

    /// Parameters of the point on the surface nearest to `point`.
    pub fn invert(&self, kernel: &K, point: &Point3) -> ModelResult<(f64, f64)> {
        kernel
            .project_point_to_surface(&self.surface, point)
            .ok_or(ModelError::ProjectionFailure {
                point: [point.x, point.y, point.z],
            })
    }

    /// Independent copy reflected across `plane`, with its shape rebuilt.
    pub fn mirrored(&self, kernel: &K, plane: &Plane) -> Self {
        Self::new(kernel, kernel.mirror_surface(&self.surface, plane), self.options)
    }
}

fn derive_face<K: GeometryKernel>(kernel: &K, surface: &K::Surface, options: SrefOptions) -> K::Shape {
    let mut shape = kernel.face_from_surface(surface);
    if options.divide_closed {
        shape = kernel.divide_closed(&shape);
    }
    if options.divide_c0 {
        shape = kernel.divide_c0(&shape);
    }
    shape
}

/// A one-parameter reference curve and its derived edge.
#[derive(Debug, Clone)]
pub struct ReferenceCurve<K: GeometryKernel> {
    curve: K::Curve,
    bounds: (f64, f64),
    shape: K::Shape,
}

impl<K: GeometryKernel> ReferenceCurve<K> {
    pub fn new(kernel: &K, curve: K::Curve) -> Self {
        let bounds = kernel.curve_bounds(&curve);
        let shape = kernel.edge_from_curve(&curve);
        Self { curve, bounds, shape }
    }

    /// Accepts [`Geometry::Curve`] only.
    pub fn from_geometry(kernel: &K, geometry: Geometry<K>) -> ModelResult<Self> {
        Ok(Self::new(kernel, geometry.into_curve()?))
    }

    pub fn curve(&self) -> &K::Curve {
        &self.curve
    }

    pub fn shape(&self) -> &K::Shape {
        &self.shape
    }

    pub fn u1(&self) -> f64 {
        self.bounds.0
    }

    pub fn u2(&self) -> f64 {
        self.bounds.1
    }

    pub fn eval(&self, kernel: &K, u: f64) -> Point3 {
        kernel.curve_eval(&self.curve, u)
    }

    pub fn invert(&self, kernel: &K, point: &Point3) -> ModelResult<f64> {
        kernel
            .project_point_to_curve(&self.curve, point)
            .ok_or(ModelError::ProjectionFailure {
                point: [point.x, point.y, point.z],
            })
    }

    /// Start point, `eval(u1)`.
    pub fn p1(&self, kernel: &K) -> Point3 {
        self.eval(kernel, self.bounds.0)
    }

    /// End point, `eval(u2)`.
    pub fn p2(&self, kernel: &K) -> Point3 {
        self.eval(kernel, self.bounds.1)
    }

    pub fn mirrored(&self, kernel: &K, plane: &Plane) -> Self {
        Self::new(kernel, kernel.mirror_curve(&self.curve, plane))
    }
}
