//! Parametric curves: reference curves and section results.

use super::{Plane, Point3, Vector3, EPSILON};
use serde::{Deserialize, Serialize};

/// A straight segment `origin + t · direction` for `t` in `range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineCurve {
    pub origin: Point3,
    pub direction: Vector3,
    pub range: (f64, f64),
}

impl LineCurve {
    /// Segment from `p1` to `p2`, parametrized by arc length from `p1`.
    pub fn between(p1: Point3, p2: Point3) -> Option<Self> {
        let d = p2 - p1;
        let len = d.norm();
        if len < EPSILON {
            return None;
        }
        Some(Self {
            origin: p1,
            direction: d / len,
            range: (0.0, len),
        })
    }
}

/// Piecewise-linear curve. `params` is strictly increasing and has one
/// entry per point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolyline")]
pub struct PolylineCurve {
    pub points: Vec<Point3>,
    pub params: Vec<f64>,
}

#[derive(Deserialize)]
struct RawPolyline {
    points: Vec<Point3>,
    params: Vec<f64>,
}

impl TryFrom<RawPolyline> for PolylineCurve {
    type Error = String;

    fn try_from(raw: RawPolyline) -> Result<Self, Self::Error> {
        if raw.points.len() < 2 {
            return Err(format!("polyline needs at least two points, got {}", raw.points.len()));
        }
        if raw.params.len() != raw.points.len() {
            return Err(format!(
                "polyline has {} points but {} parameters",
                raw.points.len(),
                raw.params.len()
            ));
        }
        if raw.params.windows(2).any(|w| !(w[1] > w[0])) {
            return Err("polyline parameters must be strictly increasing".into());
        }
        Ok(Self {
            points: raw.points,
            params: raw.params,
        })
    }
}

impl PolylineCurve {
    /// Polyline through `points`, parametrized by chord length from zero.
    /// Consecutive duplicates are dropped; `None` if fewer than two distinct
    /// points remain.
    pub fn through(points: impl IntoIterator<Item = Point3>) -> Option<Self> {
        let mut pts: Vec<Point3> = Vec::new();
        for p in points {
            if pts.last().map_or(true, |last| (p - last).norm() > EPSILON * 1e-3) {
                pts.push(p);
            }
        }
        if pts.len() < 2 {
            return None;
        }
        let mut params = Vec::with_capacity(pts.len());
        let mut acc = 0.0;
        params.push(acc);
        for w in pts.windows(2) {
            acc += (w[1] - w[0]).norm();
            params.push(acc);
        }
        Some(Self { points: pts, params })
    }

    fn segment_at(&self, u: f64) -> usize {
        let idx = self.params.partition_point(|&t| t <= u);
        idx.saturating_sub(1).min(self.points.len() - 2)
    }

    fn eval(&self, u: f64) -> Point3 {
        let k = self.segment_at(u);
        let (t0, t1) = (self.params[k], self.params[k + 1]);
        let s = (u - t0) / (t1 - t0);
        self.points[k] + (self.points[k + 1] - self.points[k]) * s
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Curve {
    Line(LineCurve),
    Polyline(PolylineCurve),
}

impl Curve {
    pub fn range(&self) -> (f64, f64) {
        match self {
            Curve::Line(c) => c.range,
            Curve::Polyline(c) => (c.params[0], c.params[c.params.len() - 1]),
        }
    }

    pub fn eval(&self, u: f64) -> Point3 {
        match self {
            Curve::Line(c) => c.origin + c.direction * u,
            Curve::Polyline(c) => c.eval(u),
        }
    }

    pub fn start(&self) -> Point3 {
        self.eval(self.range().0)
    }

    pub fn end(&self) -> Point3 {
        self.eval(self.range().1)
    }

    /// Parameter that the point at `u` has after [`Curve::reverse`].
    pub fn reversed_parameter(&self, u: f64) -> f64 {
        let (a, b) = self.range();
        a + b - u
    }

    /// Reverse the direction of travel in place, keeping the range.
    pub fn reverse(&mut self) {
        let (a, b) = self.range();
        match self {
            Curve::Line(c) => {
                c.origin += c.direction * (a + b);
                c.direction = -c.direction;
            }
            Curve::Polyline(c) => {
                c.points.reverse();
                c.params = c.params.iter().rev().map(|t| a + b - t).collect();
            }
        }
    }

    /// Copy restricted to `[u1, u2]`, keeping this curve's parametrization.
    pub fn trimmed(&self, u1: f64, u2: f64) -> Option<Curve> {
        if !(u2 - u1 > f64::EPSILON) {
            return None;
        }
        match self {
            Curve::Line(c) => Some(Curve::Line(LineCurve {
                range: (u1, u2),
                ..c.clone()
            })),
            Curve::Polyline(c) => {
                let mut points = vec![c.eval(u1)];
                let mut params = vec![u1];
                for (p, &t) in c.points.iter().zip(&c.params) {
                    if t > u1 && t < u2 {
                        points.push(*p);
                        params.push(t);
                    }
                }
                points.push(c.eval(u2));
                params.push(u2);
                Some(Curve::Polyline(PolylineCurve { points, params }))
            }
        }
    }

    /// Parameter of the nearest point on the bounded curve.
    pub fn nearest_parameter(&self, point: &Point3) -> Option<f64> {
        if !super::is_finite_point(point) {
            return None;
        }
        match self {
            Curve::Line(c) => {
                let t = c.direction.dot(&(point - c.origin));
                Some(t.max(c.range.0).min(c.range.1))
            }
            Curve::Polyline(c) => {
                let mut best: Option<(f64, f64)> = None;
                for k in 0..c.points.len() - 1 {
                    let (a, b) = (c.points[k], c.points[k + 1]);
                    let ab = b - a;
                    let len2 = ab.norm_squared();
                    if len2 < f64::EPSILON {
                        continue;
                    }
                    let s = (ab.dot(&(point - a)) / len2).clamp(0.0, 1.0);
                    let d = nalgebra::distance_squared(&(a + ab * s), point);
                    if best.map_or(true, |(bd, _)| d < bd) {
                        let t = c.params[k] + s * (c.params[k + 1] - c.params[k]);
                        best = Some((d, t));
                    }
                }
                best.map(|(_, t)| t)
            }
        }
    }

    /// Distance from `point` to the bounded curve.
    pub fn distance_to(&self, point: &Point3) -> Option<f64> {
        self.nearest_parameter(point)
            .map(|t| nalgebra::distance(&self.eval(t), point))
    }

    /// Vertices of the curve (segment endpoints for a line).
    pub fn vertices(&self) -> Vec<Point3> {
        match self {
            Curve::Line(_) => vec![self.start(), self.end()],
            Curve::Polyline(c) => c.points.clone(),
        }
    }

    pub fn mirrored(&self, mirror: &Plane) -> Curve {
        match self {
            Curve::Line(c) => Curve::Line(LineCurve {
                origin: mirror.mirror_point(&c.origin),
                direction: mirror.mirror_vector(&c.direction),
                range: c.range,
            }),
            Curve::Polyline(c) => Curve::Polyline(PolylineCurve {
                points: c.points.iter().map(|p| mirror.mirror_point(p)).collect(),
                params: c.params.clone(),
            }),
        }
    }
}
