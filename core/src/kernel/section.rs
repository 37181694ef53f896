//! Plane / face sections.
//!
//! A plane cutting a face is the zero set of `f(u, v) = d(plane, S(u, v))`
//! over the face window. Planar faces are solved exactly; every other
//! surface is sampled on a parameter grid and traced with marching
//! squares. The grid overhangs the window by half a cell so that a zero
//! set lying exactly on a window edge (a plane through a boundary iso-line)
//! still falls between two rows of samples instead of onto them.

use super::{KernelOpError, KernelResult};
use crate::geometry::{ParamRect, Plane, Point3, Surface};
use std::collections::HashMap;

type Uv = (f64, f64);

/// Section polylines of `plane` with `surface` restricted to `window`.
pub fn plane_face(
    plane: &Plane,
    surface: &Surface,
    window: &ParamRect,
    samples: usize,
) -> KernelResult<Vec<Vec<Point3>>> {
    if window.is_unbounded() {
        return Err(KernelOpError::InvalidGeometry(
            "cannot section an unbounded face".into(),
        ));
    }
    if let Some(face_plane) = surface.as_plane() {
        return Ok(plane_plane(plane, face_plane, window).into_iter().collect());
    }

    let field = |u: f64, v: f64| plane.signed_distance(&surface.eval(u, v));
    let tol = 1e-9 * (window.width() + window.height());
    let step = (window.width() / samples as f64, window.height() / samples as f64);

    let mut polylines = Vec::new();
    for chain in march(&field, window, samples.max(2)) {
        for mut piece in clip_polyline(&chain, window, tol) {
            let last = piece.len() - 1;
            piece[0] = refine_on_boundary(&field, window, piece[0], step, tol);
            piece[last] = refine_on_boundary(&field, window, piece[last], step, tol);
            polylines.push(piece.iter().map(|&(u, v)| surface.eval(u, v)).collect());
        }
    }
    Ok(polylines)
}

/// Restrict 3D polylines lying on `plane` to the plane window `window`.
pub fn clip_to_plane_window(points: &[Point3], plane: &Plane, window: &ParamRect) -> Vec<Vec<Point3>> {
    let params: Vec<Uv> = points.iter().map(|p| plane.parameters(p)).collect();
    let tol = 1e-9 * (window.width() + window.height()).min(1e9);
    clip_polyline(&params, window, tol)
        .into_iter()
        .map(|piece| piece.into_iter().map(|(u, v)| plane.eval(u, v)).collect())
        .collect()
}

/// Exact section of two planes over a window of the second one.
fn plane_plane(plane: &Plane, face_plane: &Plane, window: &ParamRect) -> Option<Vec<Point3>> {
    let c = plane.signed_distance(&face_plane.origin);
    let a = plane.normal.dot(&face_plane.x_axis);
    let b = plane.normal.dot(&face_plane.y_axis);
    if a.hypot(b) < 1e-12 {
        // parallel or coincident
        return None;
    }
    let f = |(u, v): Uv| c + a * u + b * v;
    let corners = [
        (window.u1, window.v1),
        (window.u2, window.v1),
        (window.u2, window.v2),
        (window.u1, window.v2),
    ];
    let mut hits: Vec<Uv> = Vec::new();
    for k in 0..4 {
        let (p, q) = (corners[k], corners[(k + 1) % 4]);
        let (fp, fq) = (f(p), f(q));
        if fp.abs() < 1e-12 {
            hits.push(p);
        } else if (fp < 0.0) != (fq < 0.0) && fq.abs() >= 1e-12 {
            hits.push(lerp(p, q, fp / (fp - fq)));
        }
    }

    // the two hits farthest apart span the segment
    let mut best: Option<(f64, Uv, Uv)> = None;
    for (i, &p) in hits.iter().enumerate() {
        for &q in &hits[i + 1..] {
            let d = (q.0 - p.0).hypot(q.1 - p.1);
            if best.map_or(true, |(bd, _, _)| d > bd) {
                best = Some((d, p, q));
            }
        }
    }
    let (len, p, q) = best?;
    if len < 1e-12 {
        return None;
    }
    Some(vec![face_plane.eval(p.0, p.1), face_plane.eval(q.0, q.1)])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GridEdge {
    /// From node `(i, j)` to `(i + 1, j)`.
    U(usize, usize),
    /// From node `(i, j)` to `(i, j + 1)`.
    V(usize, usize),
}

struct Grid<'a> {
    field: &'a dyn Fn(f64, f64) -> f64,
    us: Vec<f64>,
    vs: Vec<f64>,
    values: Vec<f64>,
    points: Vec<Uv>,
    index: HashMap<GridEdge, usize>,
    links: Vec<Vec<usize>>,
}

impl<'a> Grid<'a> {
    fn sample(field: &'a dyn Fn(f64, f64) -> f64, window: &ParamRect, n: usize) -> Self {
        let (du, dv) = (window.width() / n as f64, window.height() / n as f64);
        let us: Vec<f64> = (0..n + 2).map(|i| window.u1 - 0.5 * du + i as f64 * du).collect();
        let vs: Vec<f64> = (0..n + 2).map(|j| window.v1 - 0.5 * dv + j as f64 * dv).collect();
        let mut values = Vec::with_capacity(us.len() * vs.len());
        for &u in &us {
            for &v in &vs {
                values.push(field(u, v));
            }
        }
        Self {
            field,
            us,
            vs,
            values,
            points: Vec::new(),
            index: HashMap::new(),
            links: Vec::new(),
        }
    }

    fn value(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.vs.len() + j]
    }

    /// Zero counts as positive so that each edge is crossed at most once.
    fn positive(&self, i: usize, j: usize) -> bool {
        self.value(i, j) >= 0.0
    }

    fn crossing(&mut self, edge: GridEdge) -> usize {
        if let Some(&k) = self.index.get(&edge) {
            return k;
        }
        let ((ia, ja), (ib, jb)) = match edge {
            GridEdge::U(i, j) => ((i, j), (i + 1, j)),
            GridEdge::V(i, j) => ((i, j), (i, j + 1)),
        };
        let a = (self.us[ia], self.vs[ja]);
        let b = (self.us[ib], self.vs[jb]);
        let field = self.field;
        let t = refine_root(
            |t| {
                let (u, v) = lerp(a, b, t);
                field(u, v)
            },
            0.0,
            1.0,
            self.value(ia, ja),
            self.value(ib, jb),
        );
        let k = self.points.len();
        self.points.push(lerp(a, b, t));
        self.links.push(Vec::new());
        self.index.insert(edge, k);
        k
    }

    fn link(&mut self, e1: GridEdge, e2: GridEdge) {
        let a = self.crossing(e1);
        let b = self.crossing(e2);
        self.links[a].push(b);
        self.links[b].push(a);
    }

    fn contour(&mut self) {
        let (nu, nv) = (self.us.len() - 1, self.vs.len() - 1);
        for i in 0..nu {
            for j in 0..nv {
                let s = [
                    self.positive(i, j),
                    self.positive(i + 1, j),
                    self.positive(i + 1, j + 1),
                    self.positive(i, j + 1),
                ];
                let edges = [
                    GridEdge::U(i, j),
                    GridEdge::V(i + 1, j),
                    GridEdge::U(i, j + 1),
                    GridEdge::V(i, j),
                ];
                let crossed = [s[0] != s[1], s[1] != s[2], s[3] != s[2], s[0] != s[3]];
                let hit: Vec<GridEdge> = edges
                    .iter()
                    .zip(crossed)
                    .filter_map(|(e, c)| c.then_some(*e))
                    .collect();
                match hit.len() {
                    2 => self.link(hit[0], hit[1]),
                    4 => {
                        // saddle: the centre decides which diagonal is connected
                        let uc = 0.5 * (self.us[i] + self.us[i + 1]);
                        let vc = 0.5 * (self.vs[j] + self.vs[j + 1]);
                        if ((self.field)(uc, vc) >= 0.0) == s[0] {
                            self.link(edges[0], edges[1]);
                            self.link(edges[2], edges[3]);
                        } else {
                            self.link(edges[3], edges[0]);
                            self.link(edges[1], edges[2]);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    /// Open chains first (from their free ends), then closed loops.
    fn chains(&self) -> Vec<Vec<Uv>> {
        let n = self.points.len();
        let mut visited = vec![false; n];
        let mut chains = Vec::new();
        let starts = (0..n)
            .filter(|&k| self.links[k].len() == 1)
            .chain(0..n)
            .collect::<Vec<_>>();
        for start in starts {
            if visited[start] {
                continue;
            }
            let mut chain = vec![start];
            visited[start] = true;
            let mut cur = start;
            while let Some(next) = self.links[cur].iter().copied().find(|&k| !visited[k]) {
                visited[next] = true;
                chain.push(next);
                cur = next;
            }
            if chain.len() > 2 && self.links[cur].contains(&start) {
                chain.push(start);
            }
            chains.push(chain.into_iter().map(|k| self.points[k]).collect());
        }
        chains
    }
}

fn march(field: &dyn Fn(f64, f64) -> f64, window: &ParamRect, n: usize) -> Vec<Vec<Uv>> {
    let mut grid = Grid::sample(field, window, n);
    grid.contour();
    grid.chains()
}

/// Clip a polyline to `rect` grown by `tol`, clamping the result back into
/// `rect`. A polyline leaving and re-entering the window yields one piece
/// per visit.
pub fn clip_polyline(points: &[Uv], rect: &ParamRect, tol: f64) -> Vec<Vec<Uv>> {
    let grown = ParamRect {
        u1: rect.u1 - tol,
        u2: rect.u2 + tol,
        v1: rect.v1 - tol,
        v2: rect.v2 + tol,
    };
    let mut pieces = Vec::new();
    let mut current: Vec<Uv> = Vec::new();
    for w in points.windows(2) {
        let (p, q) = (w[0], w[1]);
        match clip_segment(p, q, &grown) {
            Some((t0, t1)) => {
                if t0 > 0.0 && !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
                if current.is_empty() {
                    current.push(lerp(p, q, t0));
                }
                current.push(lerp(p, q, t1));
                if t1 < 1.0 {
                    pieces.push(std::mem::take(&mut current));
                }
            }
            None => {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
        .into_iter()
        .map(|piece| piece.into_iter().map(|(u, v)| rect.clamp(u, v)).collect::<Vec<_>>())
        .filter(|piece: &Vec<Uv>| piece.len() >= 2)
        .collect()
}

/// Liang–Barsky: parameter range of segment `p → q` inside `r`.
fn clip_segment(p: Uv, q: Uv, r: &ParamRect) -> Option<(f64, f64)> {
    let (dx, dy) = (q.0 - p.0, q.1 - p.1);
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    for (pk, qk) in [
        (-dx, p.0 - r.u1),
        (dx, r.u2 - p.0),
        (-dy, p.1 - r.v1),
        (dy, r.v2 - p.1),
    ] {
        if pk == 0.0 {
            if qk < 0.0 {
                return None;
            }
        } else {
            let t = qk / pk;
            if pk < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    (t0 <= t1).then_some((t0, t1))
}

/// Move a piece end lying on a window edge onto the true zero along that
/// edge's iso-line.
fn refine_on_boundary(
    field: &dyn Fn(f64, f64) -> f64,
    window: &ParamRect,
    (u, v): Uv,
    (du, dv): (f64, f64),
    tol: f64,
) -> Uv {
    let along_v = |u_fixed: f64| {
        let (a, b) = ((v - dv).max(window.v1), (v + dv).min(window.v2));
        let (fa, fb) = (field(u_fixed, a), field(u_fixed, b));
        if (fa >= 0.0) != (fb >= 0.0) {
            (u_fixed, refine_root(|t| field(u_fixed, t), a, b, fa, fb))
        } else {
            (u_fixed, v)
        }
    };
    let along_u = |v_fixed: f64| {
        let (a, b) = ((u - du).max(window.u1), (u + du).min(window.u2));
        let (fa, fb) = (field(a, v_fixed), field(b, v_fixed));
        if (fa >= 0.0) != (fb >= 0.0) {
            (refine_root(|t| field(t, v_fixed), a, b, fa, fb), v_fixed)
        } else {
            (u, v_fixed)
        }
    };
    if (u - window.u1).abs() <= tol {
        along_v(window.u1)
    } else if (u - window.u2).abs() <= tol {
        along_v(window.u2)
    } else if (v - window.v1).abs() <= tol {
        along_u(window.v1)
    } else if (v - window.v2).abs() <= tol {
        along_u(window.v2)
    } else {
        (u, v)
    }
}

/// Illinois regula falsi on `[a, b]`, where `fa` and `fb` straddle zero.
fn refine_root(g: impl Fn(f64) -> f64, mut a: f64, mut b: f64, mut fa: f64, mut fb: f64) -> f64 {
    let mut x = 0.5 * (a + b);
    let mut side = 0;
    for _ in 0..60 {
        if fa == fb {
            break;
        }
        x = (a * fb - b * fa) / (fb - fa);
        let fx = g(x);
        if fx.abs() < 1e-14 || (b - a).abs() < 1e-15 {
            break;
        }
        if (fx >= 0.0) == (fb >= 0.0) {
            b = x;
            fb = fx;
            if side == -1 {
                fa *= 0.5;
            }
            side = -1;
        } else {
            a = x;
            fa = fx;
            if side == 1 {
                fb *= 0.5;
            }
            side = 1;
        }
    }
    x
}

fn lerp(p: Uv, q: Uv, t: f64) -> Uv {
    (p.0 + (q.0 - p.0) * t, p.1 + (q.1 - p.1) * t)
}
