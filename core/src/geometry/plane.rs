use super::{Point3, Vector3, EPSILON};
use serde::{Deserialize, Serialize};

/// A plane with an orthonormal in-plane basis.
///
/// `normal` is always `x_axis × y_axis`, so evaluating `(u, v)` and
/// projecting back are exact inverses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub origin: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub normal: Vector3,
}

impl Plane {
    /// Create a new plane from origin point and normal vector.
    /// The in-plane axes are chosen deterministically from the normal.
    pub fn new(origin: Point3, normal: Vector3) -> Self {
        let n = normal.normalize();
        let x_axis = orthogonal_unit(&n);
        let y_axis = n.cross(&x_axis);
        Self {
            origin,
            x_axis,
            y_axis,
            normal: n,
        }
    }

    /// Plane through origin with an explicit x direction. The x direction is
    /// projected into the plane first.
    pub fn with_x_axis(origin: Point3, normal: Vector3, x_dir: Vector3) -> Option<Self> {
        let n = normal.try_normalize(EPSILON)?;
        let x_axis = (x_dir - n * x_dir.dot(&n)).try_normalize(EPSILON)?;
        let y_axis = n.cross(&x_axis);
        Some(Self {
            origin,
            x_axis,
            y_axis,
            normal: n,
        })
    }

    /// Plane through three points. The first point is the origin and the
    /// x axis points toward the second one.
    ///
    /// Returns `None` when the points are coincident or collinear.
    pub fn by_points(p1: &Point3, p2: &Point3, p3: &Point3) -> Option<Self> {
        let a = p2 - p1;
        let b = p3 - p1;
        let (la, lb) = (a.norm(), b.norm());
        if la < EPSILON || lb < EPSILON {
            return None;
        }
        let n = a.cross(&b);
        // sine of the angle between the two chords
        if n.norm() < EPSILON * la * lb {
            return None;
        }
        Self::with_x_axis(*p1, n, a)
    }

    /// XY plane at the given origin.
    pub fn xy(origin: Point3) -> Self {
        Self {
            origin,
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
            normal: Vector3::z(),
        }
    }

    /// XZ plane at the given origin, normal along -Y so that x × z style
    /// axes stay right-handed.
    pub fn xz(origin: Point3) -> Self {
        Self {
            origin,
            x_axis: Vector3::x(),
            y_axis: Vector3::z(),
            normal: -Vector3::y(),
        }
    }

    /// YZ plane at the given origin.
    pub fn yz(origin: Point3) -> Self {
        Self {
            origin,
            x_axis: Vector3::y(),
            y_axis: Vector3::z(),
            normal: Vector3::x(),
        }
    }

    /// Point at in-plane coordinates `(u, v)`.
    pub fn eval(&self, u: f64, v: f64) -> Point3 {
        self.origin + self.x_axis * u + self.y_axis * v
    }

    /// In-plane coordinates of the orthogonal projection of `point`.
    pub fn parameters(&self, point: &Point3) -> (f64, f64) {
        let d = point - self.origin;
        (d.dot(&self.x_axis), d.dot(&self.y_axis))
    }

    /// Signed distance from a point to this plane.
    /// Positive = point is on the side the normal points to.
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        self.normal.dot(&(point - self.origin))
    }

    /// Absolute distance from a point to this plane.
    pub fn distance(&self, point: &Point3) -> f64 {
        self.signed_distance(point).abs()
    }

    /// Project a point onto this plane.
    pub fn project_point(&self, point: &Point3) -> Point3 {
        point - self.normal * self.signed_distance(point)
    }

    /// Reflection of a point across this plane.
    pub fn mirror_point(&self, point: &Point3) -> Point3 {
        point - self.normal * (2.0 * self.signed_distance(point))
    }

    /// Reflection of a direction across this plane.
    pub fn mirror_vector(&self, v: &Vector3) -> Vector3 {
        v - self.normal * (2.0 * v.dot(&self.normal))
    }

    /// This plane reflected across `mirror`. The reflected axes change
    /// handedness, so the normal is recomputed from them.
    pub fn mirrored(&self, mirror: &Plane) -> Self {
        let x_axis = mirror.mirror_vector(&self.x_axis);
        let y_axis = mirror.mirror_vector(&self.y_axis);
        Self {
            origin: mirror.mirror_point(&self.origin),
            x_axis,
            y_axis,
            normal: x_axis.cross(&y_axis),
        }
    }
}

/// A unit vector orthogonal to `n`, stable for axis-aligned normals.
fn orthogonal_unit(n: &Vector3) -> Vector3 {
    let candidate = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    (candidate - n * candidate.dot(n)).normalize()
}
