//! Parametric surfaces accepted as reference geometry.

use super::{Plane, Point3, Vector3, EPSILON};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Parameter magnitude treated as "no bound" (planes).
pub const UNBOUNDED: f64 = 2.0e100;

/// A rectangular window in `(u, v)` parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRect {
    pub u1: f64,
    pub u2: f64,
    pub v1: f64,
    pub v2: f64,
}

impl ParamRect {
    /// Create a window, ordering each pair of bounds.
    pub fn new(u1: f64, u2: f64, v1: f64, v2: f64) -> Self {
        Self {
            u1: u1.min(u2),
            u2: u1.max(u2),
            v1: v1.min(v2),
            v2: v1.max(v2),
        }
    }

    pub fn unit() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }

    pub fn unbounded() -> Self {
        Self::new(-UNBOUNDED, UNBOUNDED, -UNBOUNDED, UNBOUNDED)
    }

    pub fn is_unbounded(&self) -> bool {
        self.u1 <= -UNBOUNDED || self.u2 >= UNBOUNDED || self.v1 <= -UNBOUNDED || self.v2 >= UNBOUNDED
    }

    pub fn width(&self) -> f64 {
        self.u2 - self.u1
    }

    pub fn height(&self) -> f64 {
        self.v2 - self.v1
    }

    pub fn contains(&self, u: f64, v: f64, tol: f64) -> bool {
        u >= self.u1 - tol && u <= self.u2 + tol && v >= self.v1 - tol && v <= self.v2 + tol
    }

    pub fn clamp(&self, u: f64, v: f64) -> (f64, f64) {
        (u.max(self.u1).min(self.u2), v.max(self.v1).min(self.v2))
    }

    /// Split at `u` into the lower and upper windows.
    pub fn split_u(&self, u: f64) -> (Self, Self) {
        (
            Self { u2: u, ..*self },
            Self { u1: u, ..*self },
        )
    }
}

/// A bounded window of a plane. Parameters are the plane's in-plane
/// coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneSurface {
    pub plane: Plane,
    pub bounds: ParamRect,
}

impl PlaneSurface {
    pub fn new(plane: Plane, bounds: ParamRect) -> Self {
        Self { plane, bounds }
    }

    pub fn unbounded(plane: Plane) -> Self {
        Self::new(plane, ParamRect::unbounded())
    }
}

/// A circular cylinder: `origin + r (cos u · x + sin u · y) + v · axis`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CylindricalSurface {
    pub origin: Point3,
    pub x_dir: Vector3,
    pub y_dir: Vector3,
    pub axis: Vector3,
    pub radius: f64,
    pub bounds: ParamRect,
}

impl CylindricalSurface {
    /// Full cylinder around `axis` from `origin`, `height` long.
    pub fn new(origin: Point3, axis: Vector3, radius: f64, height: f64) -> Self {
        let base = Plane::new(origin, axis);
        Self {
            origin,
            x_dir: base.x_axis,
            y_dir: base.y_axis,
            axis: base.normal,
            radius,
            bounds: ParamRect::new(0.0, TAU, 0.0, height),
        }
    }

    pub fn with_bounds(mut self, bounds: ParamRect) -> Self {
        self.bounds = bounds;
        self
    }
}

/// Linear interpolation between two polyline rails with matching vertex
/// counts. Both parameters run over `[0, 1]`; rail vertex `i` sits at
/// `u = i / (n - 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRuled")]
pub struct RuledSurface {
    pub first: Vec<Point3>,
    pub second: Vec<Point3>,
}

#[derive(Deserialize)]
struct RawRuled {
    first: Vec<Point3>,
    second: Vec<Point3>,
}

impl TryFrom<RawRuled> for RuledSurface {
    type Error = String;

    fn try_from(raw: RawRuled) -> Result<Self, Self::Error> {
        let (n1, n2) = (raw.first.len(), raw.second.len());
        RuledSurface::new(raw.first, raw.second)
            .ok_or_else(|| format!("ruled surface rails need matching counts of at least two vertices, got {} and {}", n1, n2))
    }
}

impl RuledSurface {
    /// Returns `None` unless both rails have the same number (at least two)
    /// of vertices.
    pub fn new(first: Vec<Point3>, second: Vec<Point3>) -> Option<Self> {
        if first.len() < 2 || first.len() != second.len() {
            return None;
        }
        Some(Self { first, second })
    }

    /// Bilinear patch between segments `a1 → a2` and `b1 → b2`.
    pub fn between_segments(a1: Point3, a2: Point3, b1: Point3, b2: Point3) -> Self {
        Self {
            first: vec![a1, a2],
            second: vec![b1, b2],
        }
    }

    fn segments(&self) -> usize {
        self.first.len() - 1
    }

    /// Segment index and local parameter for `u`. Parameters outside
    /// `[0, 1]` extrapolate the end segments.
    fn locate(&self, u: f64) -> (usize, f64) {
        let n = self.segments();
        let s = u * n as f64;
        let k = (s.floor().max(0.0) as usize).min(n - 1);
        (k, s - k as f64)
    }

    fn rails_at(&self, u: f64) -> (Point3, Point3) {
        let (k, t) = self.locate(u);
        let a = self.first[k] + (self.first[k + 1] - self.first[k]) * t;
        let b = self.second[k] + (self.second[k + 1] - self.second[k]) * t;
        (a, b)
    }

    fn is_closed(&self) -> bool {
        let tol2 = EPSILON * EPSILON;
        let n = self.first.len() - 1;
        nalgebra::distance_squared(&self.first[0], &self.first[n]) < tol2
            && nalgebra::distance_squared(&self.second[0], &self.second[n]) < tol2
    }

    /// Interior knots where either rail's derivative jumps.
    fn c0_knots(&self) -> Vec<f64> {
        let n = self.segments();
        (1..n)
            .filter(|&i| {
                let kinked = |rail: &[Point3]| {
                    let before = rail[i] - rail[i - 1];
                    let after = rail[i + 1] - rail[i];
                    (after - before).norm() > EPSILON * before.norm().max(after.norm()).max(1.0)
                };
                kinked(&self.first) || kinked(&self.second)
            })
            .map(|i| i as f64 / n as f64)
            .collect()
    }
}

/// The closed family of reference surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Surface {
    Plane(PlaneSurface),
    Cylinder(CylindricalSurface),
    Ruled(RuledSurface),
}

impl Surface {
    pub fn bounds(&self) -> ParamRect {
        match self {
            Surface::Plane(s) => s.bounds,
            Surface::Cylinder(s) => s.bounds,
            Surface::Ruled(_) => ParamRect::unit(),
        }
    }

    pub fn eval(&self, u: f64, v: f64) -> Point3 {
        match self {
            Surface::Plane(s) => s.plane.eval(u, v),
            Surface::Cylinder(s) => {
                s.origin + (s.x_dir * u.cos() + s.y_dir * u.sin()) * s.radius + s.axis * v
            }
            Surface::Ruled(s) => {
                let (a, b) = s.rails_at(u);
                a + (b - a) * v
            }
        }
    }

    /// First partial derivatives `(∂S/∂u, ∂S/∂v)`.
    pub fn derivatives(&self, u: f64, v: f64) -> (Vector3, Vector3) {
        match self {
            Surface::Plane(s) => (s.plane.x_axis, s.plane.y_axis),
            Surface::Cylinder(s) => (
                (s.y_dir * u.cos() - s.x_dir * u.sin()) * s.radius,
                s.axis,
            ),
            Surface::Ruled(s) => {
                let (k, _) = s.locate(u);
                let n = s.segments() as f64;
                let da = (s.first[k + 1] - s.first[k]) * n;
                let db = (s.second[k + 1] - s.second[k]) * n;
                let (a, b) = s.rails_at(u);
                (da * (1.0 - v) + db * v, b - a)
            }
        }
    }

    /// Unit normal `Su × Sv`, or the zero vector at a degenerate point.
    pub fn normal(&self, u: f64, v: f64) -> Vector3 {
        let (su, sv) = self.derivatives(u, v);
        su.cross(&sv).try_normalize(EPSILON * EPSILON).unwrap_or_else(Vector3::zeros)
    }

    /// Period in `u`, if the surface is periodic there.
    pub fn u_period(&self) -> Option<f64> {
        match self {
            Surface::Plane(_) => None,
            Surface::Cylinder(_) => Some(TAU),
            Surface::Ruled(s) => s.is_closed().then_some(1.0),
        }
    }

    /// True when the `u` bounds cover a full period, leaving a seam.
    pub fn is_u_closed(&self) -> bool {
        self.u_period()
            .map(|p| self.bounds().width() >= p - EPSILON)
            .unwrap_or(false)
    }

    /// Interior `u` parameters where the surface is only C0.
    pub fn c0_u_knots(&self) -> Vec<f64> {
        match self {
            Surface::Ruled(s) => s.c0_knots(),
            _ => Vec::new(),
        }
    }

    pub fn as_plane(&self) -> Option<&Plane> {
        match self {
            Surface::Plane(s) => Some(&s.plane),
            _ => None,
        }
    }

    /// Point-wise reflection across `mirror`; parameters are preserved.
    pub fn mirrored(&self, mirror: &Plane) -> Surface {
        match self {
            Surface::Plane(s) => Surface::Plane(PlaneSurface::new(s.plane.mirrored(mirror), s.bounds)),
            Surface::Cylinder(s) => Surface::Cylinder(CylindricalSurface {
                origin: mirror.mirror_point(&s.origin),
                x_dir: mirror.mirror_vector(&s.x_dir),
                y_dir: mirror.mirror_vector(&s.y_dir),
                axis: mirror.mirror_vector(&s.axis),
                radius: s.radius,
                bounds: s.bounds,
            }),
            Surface::Ruled(s) => Surface::Ruled(RuledSurface {
                first: s.first.iter().map(|p| mirror.mirror_point(p)).collect(),
                second: s.second.iter().map(|p| mirror.mirror_point(p)).collect(),
            }),
        }
    }

    /// Parameters of the nearest point inside `window`.
    ///
    /// Returns `None` for non-finite input or when the nearest point is a
    /// degenerate point of the surface (zero tangent plane).
    pub fn nearest_parameter(
        &self,
        point: &Point3,
        window: &ParamRect,
        seeds: usize,
        max_iterations: usize,
    ) -> Option<(f64, f64)> {
        if !super::is_finite_point(point) {
            return None;
        }
        let (u, v) = match self {
            Surface::Plane(s) => {
                let (u, v) = s.plane.parameters(point);
                window.clamp(u, v)
            }
            Surface::Cylinder(s) => {
                if s.radius < EPSILON {
                    return None;
                }
                let d = point - s.origin;
                let (x, y) = (d.dot(&s.x_dir), d.dot(&s.y_dir));
                if x.hypot(y) < EPSILON {
                    // on the axis every angle is equally near
                    return None;
                }
                let u = wrap_angle(y.atan2(x), window);
                window.clamp(u, d.dot(&s.axis))
            }
            Surface::Ruled(_) => self.gauss_newton(point, window, seeds, max_iterations),
        };
        let (su, sv) = self.derivatives(u, v);
        if su.cross(&sv).norm() < EPSILON * EPSILON {
            return None;
        }
        Some((u, v))
    }

    fn gauss_newton(
        &self,
        point: &Point3,
        window: &ParamRect,
        seeds: usize,
        max_iterations: usize,
    ) -> (f64, f64) {
        let n = seeds.max(2);
        let mut best = (window.u1, window.v1);
        let mut best_d = f64::INFINITY;
        for i in 0..=n {
            for j in 0..=n {
                let u = window.u1 + window.width() * i as f64 / n as f64;
                let v = window.v1 + window.height() * j as f64 / n as f64;
                let d = nalgebra::distance_squared(&self.eval(u, v), point);
                if d < best_d {
                    best_d = d;
                    best = (u, v);
                }
            }
        }

        let (mut u, mut v) = best;
        for _ in 0..max_iterations {
            let r = self.eval(u, v) - point;
            let (su, sv) = self.derivatives(u, v);
            let (a11, a12, a22) = (su.dot(&su), su.dot(&sv), sv.dot(&sv));
            let (b1, b2) = (-su.dot(&r), -sv.dot(&r));
            let det = a11 * a22 - a12 * a12;
            if det.abs() < f64::EPSILON {
                break;
            }
            let du = (b1 * a22 - b2 * a12) / det;
            let dv = (a11 * b2 - a12 * b1) / det;
            let (nu, nv) = window.clamp(u + du, v + dv);
            let step = (nu - u).abs() + (nv - v).abs();
            u = nu;
            v = nv;
            if step < 1e-14 {
                break;
            }
        }
        (u, v)
    }
}

/// Bring an angle into `[u1, u1 + 2π)`; if that lands beyond a partial
/// window, snap to the angularly nearer bound.
fn wrap_angle(angle: f64, window: &ParamRect) -> f64 {
    let u = window.u1 + (angle - window.u1).rem_euclid(TAU);
    if u > window.u2 {
        let past_end = u - window.u2;
        let before_start = window.u1 + TAU - u;
        if past_end <= before_start {
            window.u2
        } else {
            window.u1
        }
    } else {
        u
    }
}
