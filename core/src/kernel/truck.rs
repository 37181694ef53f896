//! Truck-based implementation of the geometry kernel.
//!
//! Solids and their booleans go through `truck-modeling` / `truck-shapeops`.
//! Reference faces, edges and wires are analytic (see [`crate::geometry`])
//! and are sectioned with [`super::section`].

use super::section;
use super::{GeometryKernel, KernelOpError, KernelResult, Shape};
use crate::config::KernelSettings;
use crate::geometry::{
    BoundingBox, Curve, ParamRect, Plane, PlaneSurface, Point3, PolylineCurve, Surface, Vector3,
    EPSILON,
};
use std::collections::VecDeque;
use tracing::debug;

use truck_meshalgo::tessellation::MeshableShape;
use truck_modeling::{builder, Matrix4, Rad, Solid};

/// Truck-based kernel implementation.
#[derive(Debug, Clone, Default)]
pub struct TruckKernel {
    pub settings: KernelSettings,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kernel with the given edge connection tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self::with_settings(KernelSettings::default().with_tolerance(tolerance))
    }

    pub fn with_settings(settings: KernelSettings) -> Self {
        Self { settings }
    }

    /// Axis-aligned box solid spanning `origin` to `origin + size`.
    pub fn make_box(&self, origin: Point3, size: Vector3) -> KernelResult<Shape> {
        if size.iter().any(|d| !(*d > 0.0)) {
            return Err(KernelOpError::InvalidGeometry(format!(
                "box dimensions must be positive, got {:?}",
                size.as_slice()
            )));
        }
        let v = builder::vertex(to_truck_point(&origin));
        let edge = builder::tsweep(&v, truck_modeling::Vector3::new(size.x, 0.0, 0.0));
        let face = builder::tsweep(&edge, truck_modeling::Vector3::new(0.0, size.y, 0.0));
        let solid: Solid = builder::tsweep(&face, truck_modeling::Vector3::new(0.0, 0.0, size.z));
        Ok(Shape::Solid(solid))
    }

    /// Cylinder solid standing on `base` along +Z.
    pub fn make_cylinder(&self, base: Point3, radius: f64, height: f64) -> KernelResult<Shape> {
        if !(radius > 0.0 && height > 0.0) {
            return Err(KernelOpError::InvalidGeometry(format!(
                "cylinder needs positive radius and height, got r={} h={}",
                radius, height
            )));
        }
        let point = builder::vertex(truck_modeling::Point3::new(base.x + radius, base.y, base.z));
        let circle: truck_modeling::Wire = builder::rsweep(
            &point,
            to_truck_point(&base),
            truck_modeling::Vector3::new(0.0, 0.0, 1.0),
            Rad(7.0),
        );
        let disk = builder::try_attach_plane(&[circle])
            .map_err(|e| KernelOpError::OperationFailed(format!("Failed to create disk: {:?}", e)))?;
        let solid: Solid = builder::tsweep(&disk, truck_modeling::Vector3::new(0.0, 0.0, height));
        Ok(Shape::Solid(solid))
    }

    /// Tessellation vertices of a solid.
    fn solid_points(&self, solid: &Solid) -> Vec<Point3> {
        let meshed = solid.triangulation(self.settings.mesh_tolerance);
        let mut points = Vec::new();
        for shell in meshed.boundaries() {
            for face in shell.face_iter() {
                if let Some(mesh) = face.surface() {
                    points.extend(mesh.positions().iter().map(|p| Point3::new(p.x, p.y, p.z)));
                }
            }
        }
        points
    }

    fn face_samples(&self, surface: &Surface, window: &ParamRect) -> Vec<Point3> {
        let n = (self.settings.section_samples / 4).max(2);
        let mut points = Vec::with_capacity((n + 1) * (n + 1));
        for i in 0..=n {
            for j in 0..=n {
                let u = window.u1 + window.width() * i as f64 / n as f64;
                let v = window.v1 + window.height() * j as f64 / n as f64;
                points.push(surface.eval(u, v));
            }
        }
        points
    }

    fn distance(&self, point: &Point3, shape: &Shape) -> Option<f64> {
        match shape {
            Shape::Face { surface, window } => {
                let (u, v) = surface.nearest_parameter(
                    point,
                    window,
                    self.settings.projection_samples,
                    self.settings.max_newton_iterations,
                )?;
                Some(nalgebra::distance(&surface.eval(u, v), point))
            }
            Shape::Edge { curve } => curve.distance_to(point),
            Shape::Wire { edges } => min_of(edges.iter().map(|c| c.distance_to(point))),
            Shape::Solid(solid) => min_of(
                self.solid_points(solid)
                    .iter()
                    .map(|p| Some(nalgebra::distance(p, point))),
            ),
            Shape::Compound(items) => min_of(items.iter().map(|s| self.distance(point, s))),
        }
    }

    /// Section of `plane` (restricted to `plane_window`) with one face.
    fn section_with_plane(
        &self,
        plane: &Plane,
        plane_window: &ParamRect,
        surface: &Surface,
        window: &ParamRect,
    ) -> KernelResult<Vec<Vec<Point3>>> {
        let polylines = section::plane_face(plane, surface, window, self.settings.section_samples)?;
        if plane_window.is_unbounded() {
            return Ok(polylines);
        }
        Ok(polylines
            .iter()
            .flat_map(|pts| section::clip_to_plane_window(pts, plane, plane_window))
            .collect())
    }

    fn section_faces(
        &self,
        (sa, wa): (&Surface, &ParamRect),
        (sb, wb): (&Surface, &ParamRect),
        approximate: bool,
    ) -> KernelResult<Vec<Vec<Point3>>> {
        match (sa.as_plane(), sb.as_plane()) {
            (Some(pa), Some(pb)) => {
                if !wb.is_unbounded() {
                    self.section_with_plane(pa, wa, sb, wb)
                } else if !wa.is_unbounded() {
                    self.section_with_plane(pb, wb, sa, wa)
                } else {
                    Err(KernelOpError::InvalidGeometry(
                        "cannot section two unbounded planes".into(),
                    ))
                }
            }
            _ if !approximate => Err(KernelOpError::NotImplemented(
                "exact sections are only available between planes".into(),
            )),
            (Some(pa), None) => self.section_with_plane(pa, wa, sb, wb),
            (None, Some(pb)) => self.section_with_plane(pb, wb, sa, wa),
            (None, None) => Err(KernelOpError::NotImplemented(
                "section of two non-planar faces".into(),
            )),
        }
    }

    fn map_faces(&self, shape: &Shape, divide: &dyn Fn(&Surface, &ParamRect) -> Vec<ParamRect>) -> Shape {
        match shape {
            Shape::Face { surface, window } => Shape::compound(
                divide(surface, window)
                    .into_iter()
                    .map(|w| Shape::Face {
                        surface: surface.clone(),
                        window: w,
                    })
                    .collect(),
            ),
            Shape::Compound(items) => {
                Shape::compound(items.iter().map(|s| self.map_faces(s, divide)).collect())
            }
            other => other.clone(),
        }
    }

    /// Next unused curve touching `at`: `(index, needs_reverse)`.
    fn find_joint(&self, curves: &[Curve], used: &[bool], at: &Point3, forward: bool) -> Option<(usize, bool)> {
        let tol = self.settings.tolerance;
        let near = |p: Point3| nalgebra::distance(&p, at) <= tol;
        (0..curves.len()).filter(|&k| !used[k]).find_map(|k| {
            let (head, tail) = (curves[k].start(), curves[k].end());
            match forward {
                true if near(head) => Some((k, false)),
                true if near(tail) => Some((k, true)),
                false if near(tail) => Some((k, false)),
                false if near(head) => Some((k, true)),
                _ => None,
            }
        })
    }

    fn shape_curves(&self, shape: &Shape, out: &mut Vec<Curve>) {
        match shape {
            Shape::Edge { curve } => out.push(curve.clone()),
            Shape::Wire { edges } => out.extend(edges.iter().cloned()),
            Shape::Compound(items) => items.iter().for_each(|s| self.shape_curves(s, out)),
            Shape::Face { .. } | Shape::Solid(_) => {}
        }
    }
}

impl GeometryKernel for TruckKernel {
    type Surface = Surface;
    type Curve = Curve;
    type Shape = Shape;

    fn surface_bounds(&self, surface: &Surface) -> ParamRect {
        surface.bounds()
    }

    fn surface_eval(&self, surface: &Surface, u: f64, v: f64) -> Point3 {
        surface.eval(u, v)
    }

    fn surface_normal(&self, surface: &Surface, u: f64, v: f64) -> Vector3 {
        surface.normal(u, v)
    }

    fn project_point_to_surface(&self, surface: &Surface, point: &Point3) -> Option<(f64, f64)> {
        surface.nearest_parameter(
            point,
            &surface.bounds(),
            self.settings.projection_samples,
            self.settings.max_newton_iterations,
        )
    }

    fn mirror_surface(&self, surface: &Surface, plane: &Plane) -> Surface {
        surface.mirrored(plane)
    }

    fn plane_surface(&self, plane: &Plane) -> Surface {
        Surface::Plane(PlaneSurface::unbounded(*plane))
    }

    fn curve_bounds(&self, curve: &Curve) -> (f64, f64) {
        curve.range()
    }

    fn curve_eval(&self, curve: &Curve, u: f64) -> Point3 {
        curve.eval(u)
    }

    fn project_point_to_curve(&self, curve: &Curve, point: &Point3) -> Option<f64> {
        curve.nearest_parameter(point)
    }

    fn reverse_curve(&self, curve: &mut Curve) {
        curve.reverse();
    }

    fn reversed_parameter(&self, curve: &Curve, u: f64) -> f64 {
        curve.reversed_parameter(u)
    }

    fn trim_curve(&self, curve: &Curve, u1: f64, u2: f64) -> KernelResult<Curve> {
        curve.trimmed(u1, u2).ok_or_else(|| {
            KernelOpError::InvalidGeometry(format!("empty trim range [{}, {}]", u1, u2))
        })
    }

    fn mirror_curve(&self, curve: &Curve, plane: &Plane) -> Curve {
        curve.mirrored(plane)
    }

    fn face_from_surface(&self, surface: &Surface) -> Shape {
        Shape::face(surface.clone())
    }

    fn edge_from_curve(&self, curve: &Curve) -> Shape {
        Shape::Edge {
            curve: curve.clone(),
        }
    }

    fn surface_of_face(&self, shape: &Shape) -> Option<Surface> {
        shape.faces().first().map(|(s, _)| (*s).clone())
    }

    fn divide_closed(&self, shape: &Shape) -> Shape {
        self.map_faces(shape, &|surface, window| match surface.u_period() {
            Some(period) if window.width() >= period - EPSILON => {
                let (lo, hi) = window.split_u(window.u1 + 0.5 * window.width());
                vec![lo, hi]
            }
            _ => vec![*window],
        })
    }

    fn divide_c0(&self, shape: &Shape) -> Shape {
        self.map_faces(shape, &|surface, window| {
            let mut pieces = Vec::new();
            let mut rest = *window;
            for knot in surface.c0_u_knots() {
                if knot > rest.u1 + EPSILON && knot < rest.u2 - EPSILON {
                    let (lo, hi) = rest.split_u(knot);
                    pieces.push(lo);
                    rest = hi;
                }
            }
            pieces.push(rest);
            pieces
        })
    }

    fn intersect(&self, a: &Shape, b: &Shape, approximate: bool) -> KernelResult<Shape> {
        let (fa, fb) = (a.faces(), b.faces());
        if fa.is_empty() || fb.is_empty() {
            return Err(KernelOpError::NotImplemented(format!(
                "section of {} with {}",
                a.kind_name(),
                b.kind_name()
            )));
        }
        let mut edges = Vec::new();
        for &face_a in &fa {
            for &face_b in &fb {
                for pts in self.section_faces(face_a, face_b, approximate)? {
                    if let Some(polyline) = PolylineCurve::through(pts) {
                        edges.push(Shape::Edge {
                            curve: Curve::Polyline(polyline),
                        });
                    }
                }
            }
        }
        debug!(faces_a = fa.len(), faces_b = fb.len(), edges = edges.len(), "section computed");
        Ok(Shape::Compound(edges))
    }

    fn edges(&self, shape: &Shape) -> Vec<Shape> {
        let mut curves = Vec::new();
        self.shape_curves(shape, &mut curves);
        curves.into_iter().map(|curve| Shape::Edge { curve }).collect()
    }

    fn wires_from_edges(&self, edges: &[Shape]) -> Vec<Shape> {
        let mut curves = Vec::new();
        for edge in edges {
            self.shape_curves(edge, &mut curves);
        }

        let mut used = vec![false; curves.len()];
        let mut wires = Vec::new();
        for seed in 0..curves.len() {
            if used[seed] {
                continue;
            }
            used[seed] = true;
            let mut chain = VecDeque::from([curves[seed].clone()]);

            let mut end = curves[seed].end();
            while let Some((k, flip)) = self.find_joint(&curves, &used, &end, true) {
                used[k] = true;
                let mut c = curves[k].clone();
                if flip {
                    c.reverse();
                }
                end = c.end();
                chain.push_back(c);
            }

            let mut start = curves[seed].start();
            while let Some((k, flip)) = self.find_joint(&curves, &used, &start, false) {
                used[k] = true;
                let mut c = curves[k].clone();
                if flip {
                    c.reverse();
                }
                start = c.start();
                chain.push_front(c);
            }

            wires.push(Shape::Wire {
                edges: Vec::from(chain),
            });
        }
        debug!(edges = curves.len(), wires = wires.len(), "edges grouped into wires");
        wires
    }

    fn wire_curve(&self, wire: &Shape) -> KernelResult<Curve> {
        match wire {
            Shape::Edge { curve } => Ok(curve.clone()),
            Shape::Wire { edges } if edges.len() == 1 => Ok(edges[0].clone()),
            Shape::Wire { edges } => PolylineCurve::through(edges.iter().flat_map(|c| c.vertices()))
                .map(Curve::Polyline)
                .ok_or_else(|| KernelOpError::InvalidGeometry("degenerate wire".into())),
            other => Err(KernelOpError::InvalidGeometry(format!(
                "expected a wire, found {}",
                other.kind_name()
            ))),
        }
    }

    fn nearest_shape(&self, point: &Point3, shapes: &[Shape]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, shape) in shapes.iter().enumerate() {
            if let Some(d) = self.distance(point, shape) {
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((i, d));
                }
            }
        }
        best.map(|(i, _)| i)
    }

    fn mirror_shape(&self, shape: &Shape, plane: &Plane) -> KernelResult<Shape> {
        Ok(match shape {
            Shape::Solid(solid) => {
                let mut mirrored: Solid = builder::transformed(solid, reflection(plane));
                // a reflection flips orientation
                mirrored.not();
                Shape::Solid(mirrored)
            }
            Shape::Face { surface, window } => Shape::Face {
                surface: surface.mirrored(plane),
                window: *window,
            },
            Shape::Edge { curve } => Shape::Edge {
                curve: curve.mirrored(plane),
            },
            Shape::Wire { edges } => Shape::Wire {
                edges: edges.iter().map(|c| c.mirrored(plane)).collect(),
            },
            Shape::Compound(items) => Shape::Compound(
                items
                    .iter()
                    .map(|s| self.mirror_shape(s, plane))
                    .collect::<KernelResult<Vec<_>>>()?,
            ),
        })
    }

    fn bounding_box(&self, shape: &Shape) -> Option<BoundingBox> {
        match shape {
            Shape::Solid(solid) => BoundingBox::from_points(self.solid_points(solid)),
            Shape::Face { window, .. } if window.is_unbounded() => None,
            Shape::Face { surface, window } => BoundingBox::from_points(self.face_samples(surface, window)),
            Shape::Edge { curve } => BoundingBox::from_points(curve.vertices()),
            Shape::Wire { edges } => BoundingBox::from_points(edges.iter().flat_map(|c| c.vertices())),
            Shape::Compound(items) => items
                .iter()
                .filter_map(|s| self.bounding_box(s))
                .reduce(|mut acc, b| {
                    acc.merge(&b);
                    acc
                }),
        }
    }

    fn is_valid(&self, shape: &Shape) -> bool {
        match shape {
            Shape::Solid(solid) => {
                !solid.boundaries().is_empty()
                    && solid.boundaries().iter().all(|shell| shell.face_iter().next().is_some())
            }
            Shape::Face { surface, window } => {
                window.width() > 0.0
                    && window.height() > 0.0
                    && (window.is_unbounded()
                        || crate::geometry::is_finite_point(
                            &surface.eval(0.5 * (window.u1 + window.u2), 0.5 * (window.v1 + window.v2)),
                        ))
            }
            Shape::Edge { curve } => {
                let (a, b) = curve.range();
                b > a && crate::geometry::is_finite_point(&curve.start())
                    && crate::geometry::is_finite_point(&curve.end())
            }
            Shape::Wire { edges } => {
                !edges.is_empty()
                    && edges.windows(2).all(|w| {
                        nalgebra::distance(&w[0].end(), &w[1].start()) <= self.settings.tolerance
                    })
            }
            Shape::Compound(items) => !items.is_empty() && items.iter().all(|s| self.is_valid(s)),
        }
    }

    // === Boolean Operations ===

    fn fuse(&self, a: &Shape, b: &Shape) -> KernelResult<Shape> {
        match (a, b) {
            (Shape::Solid(sa), Shape::Solid(sb)) => {
                truck_shapeops::or(sa, sb, self.settings.boolean_tolerance)
                    .map(Shape::Solid)
                    .ok_or_else(|| KernelOpError::OperationFailed("Boolean union failed".into()))
            }
            _ => {
                debug!(a = a.kind_name(), b = b.kind_name(), "fuse without solids collects a compound");
                Ok(Shape::compound(vec![a.clone(), b.clone()]))
            }
        }
    }

    fn cut(&self, a: &Shape, b: &Shape) -> KernelResult<Shape> {
        match (a, b) {
            (Shape::Solid(sa), Shape::Solid(sb)) => {
                // A - B = A AND (NOT B); not() mutates in place
                let mut complement = sb.clone();
                complement.not();
                truck_shapeops::and(sa, &complement, self.settings.boolean_tolerance)
                    .map(Shape::Solid)
                    .ok_or_else(|| KernelOpError::OperationFailed("Boolean subtraction failed".into()))
            }
            _ => Err(KernelOpError::NotImplemented(format!(
                "cut of {} by {}",
                a.kind_name(),
                b.kind_name()
            ))),
        }
    }

    fn split(&self, shape: &Shape, tool: &Shape) -> KernelResult<Shape> {
        match (shape, tool) {
            (Shape::Solid(sa), Shape::Solid(sb)) => {
                let tol = self.settings.boolean_tolerance;
                let mut complement = sb.clone();
                complement.not();
                let pieces: Vec<Shape> = [
                    truck_shapeops::and(sa, sb, tol),
                    truck_shapeops::and(sa, &complement, tol),
                ]
                .into_iter()
                .flatten()
                .map(Shape::Solid)
                .collect();
                if pieces.is_empty() {
                    return Err(KernelOpError::OperationFailed("Boolean split failed".into()));
                }
                Ok(Shape::compound(pieces))
            }
            _ => Err(KernelOpError::NotImplemented(format!(
                "split of {} by {}",
                shape.kind_name(),
                tool.kind_name()
            ))),
        }
    }

    fn unify(&self, shape: &Shape) -> KernelResult<Shape> {
        let Shape::Compound(items) = shape else {
            return Ok(shape.clone());
        };
        let mut faces: Vec<(Surface, ParamRect)> = Vec::new();
        let mut others = Vec::new();
        for item in items {
            match item {
                Shape::Face { surface, window } => faces.push((surface.clone(), *window)),
                other => others.push(self.unify(other)?),
            }
        }

        'merge: loop {
            for i in 0..faces.len() {
                for j in i + 1..faces.len() {
                    if faces[i].0 != faces[j].0 {
                        continue;
                    }
                    if let Some(window) = adjacent_union(&faces[i].1, &faces[j].1) {
                        faces[i].1 = window;
                        faces.remove(j);
                        continue 'merge;
                    }
                }
            }
            break;
        }

        let mut out: Vec<Shape> = faces
            .into_iter()
            .map(|(surface, window)| Shape::Face { surface, window })
            .collect();
        out.extend(others);
        Ok(Shape::compound(out))
    }
}

/// Union of two windows that share a full edge.
fn adjacent_union(a: &ParamRect, b: &ParamRect) -> Option<ParamRect> {
    let close = |x: f64, y: f64| (x - y).abs() <= EPSILON;
    let same_v = close(a.v1, b.v1) && close(a.v2, b.v2);
    let same_u = close(a.u1, b.u1) && close(a.u2, b.u2);
    if same_v && (close(a.u2, b.u1) || close(b.u2, a.u1)) {
        return Some(ParamRect::new(a.u1.min(b.u1), a.u2.max(b.u2), a.v1, a.v2));
    }
    if same_u && (close(a.v2, b.v1) || close(b.v2, a.v1)) {
        return Some(ParamRect::new(a.u1, a.u2, a.v1.min(b.v1), a.v2.max(b.v2)));
    }
    None
}

/// Homogeneous reflection across `plane`: `x' = (I - 2nnᵀ) x + 2 (n·o) n`.
#[rustfmt::skip]
fn reflection(plane: &Plane) -> Matrix4 {
    let n = plane.normal;
    let d = 2.0 * n.dot(&plane.origin.coords);
    let m = |i: usize, j: usize| {
        let delta = if i == j { 1.0 } else { 0.0 };
        delta - 2.0 * n[i] * n[j]
    };
    // column-major
    Matrix4::new(
        m(0, 0), m(1, 0), m(2, 0), 0.0,
        m(0, 1), m(1, 1), m(2, 1), 0.0,
        m(0, 2), m(1, 2), m(2, 2), 0.0,
        d * n.x, d * n.y, d * n.z, 1.0,
    )
}

fn to_truck_point(p: &Point3) -> truck_modeling::Point3 {
    truck_modeling::Point3::new(p.x, p.y, p.z)
}

fn min_of(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
}
