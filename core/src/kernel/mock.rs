//! MockKernel: scripted test double over [`TruckKernel`].
//!
//! Geometry queries delegate to the real kernel; section results and
//! boolean / projection failures can be scripted so that orchestration code
//! sees a controlled kernel.

use super::{GeometryKernel, KernelOpError, KernelResult, Shape, TruckKernel};
use crate::geometry::{BoundingBox, Curve, ParamRect, Plane, Point3, Surface, Vector3, EPSILON};

#[derive(Debug, Clone, Default)]
pub(crate) struct MockKernel {
    inner: TruckKernel,
    /// Wires reported by every section, in discovery order.
    section_wires: Option<Vec<Shape>>,
    fail_fuse: bool,
    fail_cut: bool,
    fail_split: bool,
    fail_unify: bool,
    fail_curve_projection: bool,
    /// Curve projections of points within `EPSILON` of this one fail.
    fail_projection_near: Option<Point3>,
}

impl MockKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section_wires(mut self, wires: Vec<Shape>) -> Self {
        self.section_wires = Some(wires);
        self
    }

    pub fn failing_fuse(mut self) -> Self {
        self.fail_fuse = true;
        self
    }

    pub fn failing_cut(mut self) -> Self {
        self.fail_cut = true;
        self
    }

    pub fn failing_split(mut self) -> Self {
        self.fail_split = true;
        self
    }

    pub fn failing_unify(mut self) -> Self {
        self.fail_unify = true;
        self
    }

    pub fn failing_curve_projection(mut self) -> Self {
        self.fail_curve_projection = true;
        self
    }

    pub fn failing_curve_projection_near(mut self, point: Point3) -> Self {
        self.fail_projection_near = Some(point);
        self
    }

    pub fn truck(&self) -> &TruckKernel {
        &self.inner
    }
}

fn scripted(op: &str) -> KernelOpError {
    KernelOpError::OperationFailed(format!("scripted {} failure", op))
}

impl GeometryKernel for MockKernel {
    type Surface = Surface;
    type Curve = Curve;
    type Shape = Shape;

    fn surface_bounds(&self, surface: &Surface) -> ParamRect {
        self.inner.surface_bounds(surface)
    }

    fn surface_eval(&self, surface: &Surface, u: f64, v: f64) -> Point3 {
        self.inner.surface_eval(surface, u, v)
    }

    fn surface_normal(&self, surface: &Surface, u: f64, v: f64) -> Vector3 {
        self.inner.surface_normal(surface, u, v)
    }

    fn project_point_to_surface(&self, surface: &Surface, point: &Point3) -> Option<(f64, f64)> {
        self.inner.project_point_to_surface(surface, point)
    }

    fn mirror_surface(&self, surface: &Surface, plane: &Plane) -> Surface {
        self.inner.mirror_surface(surface, plane)
    }

    fn plane_surface(&self, plane: &Plane) -> Surface {
        self.inner.plane_surface(plane)
    }

    fn curve_bounds(&self, curve: &Curve) -> (f64, f64) {
        self.inner.curve_bounds(curve)
    }

    fn curve_eval(&self, curve: &Curve, u: f64) -> Point3 {
        self.inner.curve_eval(curve, u)
    }

    fn project_point_to_curve(&self, curve: &Curve, point: &Point3) -> Option<f64> {
        if self.fail_curve_projection {
            return None;
        }
        if self
            .fail_projection_near
            .is_some_and(|near| (near - *point).norm() < EPSILON)
        {
            return None;
        }
        self.inner.project_point_to_curve(curve, point)
    }

    fn reverse_curve(&self, curve: &mut Curve) {
        self.inner.reverse_curve(curve)
    }

    fn reversed_parameter(&self, curve: &Curve, u: f64) -> f64 {
        self.inner.reversed_parameter(curve, u)
    }

    fn trim_curve(&self, curve: &Curve, u1: f64, u2: f64) -> KernelResult<Curve> {
        self.inner.trim_curve(curve, u1, u2)
    }

    fn mirror_curve(&self, curve: &Curve, plane: &Plane) -> Curve {
        self.inner.mirror_curve(curve, plane)
    }

    fn face_from_surface(&self, surface: &Surface) -> Shape {
        self.inner.face_from_surface(surface)
    }

    fn edge_from_curve(&self, curve: &Curve) -> Shape {
        self.inner.edge_from_curve(curve)
    }

    fn surface_of_face(&self, shape: &Shape) -> Option<Surface> {
        self.inner.surface_of_face(shape)
    }

    fn divide_closed(&self, shape: &Shape) -> Shape {
        self.inner.divide_closed(shape)
    }

    fn divide_c0(&self, shape: &Shape) -> Shape {
        self.inner.divide_c0(shape)
    }

    fn intersect(&self, a: &Shape, b: &Shape, approximate: bool) -> KernelResult<Shape> {
        match &self.section_wires {
            Some(wires) => Ok(Shape::Compound(wires.clone())),
            None => self.inner.intersect(a, b, approximate),
        }
    }

    fn edges(&self, shape: &Shape) -> Vec<Shape> {
        self.inner.edges(shape)
    }

    fn wires_from_edges(&self, edges: &[Shape]) -> Vec<Shape> {
        match &self.section_wires {
            Some(wires) => wires.clone(),
            None => self.inner.wires_from_edges(edges),
        }
    }

    fn wire_curve(&self, wire: &Shape) -> KernelResult<Curve> {
        self.inner.wire_curve(wire)
    }

    fn nearest_shape(&self, point: &Point3, shapes: &[Shape]) -> Option<usize> {
        self.inner.nearest_shape(point, shapes)
    }

    fn mirror_shape(&self, shape: &Shape, plane: &Plane) -> KernelResult<Shape> {
        self.inner.mirror_shape(shape, plane)
    }

    fn bounding_box(&self, shape: &Shape) -> Option<BoundingBox> {
        self.inner.bounding_box(shape)
    }

    fn is_valid(&self, shape: &Shape) -> bool {
        self.inner.is_valid(shape)
    }

    fn fuse(&self, a: &Shape, b: &Shape) -> KernelResult<Shape> {
        if self.fail_fuse {
            return Err(scripted("fuse"));
        }
        self.inner.fuse(a, b)
    }

    fn cut(&self, a: &Shape, b: &Shape) -> KernelResult<Shape> {
        if self.fail_cut {
            return Err(scripted("cut"));
        }
        self.inner.cut(a, b)
    }

    fn split(&self, shape: &Shape, tool: &Shape) -> KernelResult<Shape> {
        if self.fail_split {
            return Err(scripted("split"));
        }
        self.inner.split(shape, tool)
    }

    fn unify(&self, shape: &Shape) -> KernelResult<Shape> {
        if self.fail_unify {
            return Err(scripted("unify"));
        }
        self.inner.unify(shape)
    }
}
