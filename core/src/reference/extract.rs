//! Plane and curve extraction on a reference surface.

use super::{Geometry, ReferenceSurface};
use crate::error::{Endpoint, ModelError, ModelResult};
use crate::geometry::Plane;
use crate::kernel::GeometryKernel;
use tracing::debug;

impl<K: GeometryKernel> ReferenceSurface<K> {
    /// Plane through `S(u1, v1)`, `S(u2, v2)` and `S(u1, v1) + N(u1, v1)`.
    ///
    /// The plane contains the surface normal at the first location, so it
    /// cuts the surface roughly square between the two locations.
    pub fn extract_plane(&self, kernel: &K, u1: f64, v1: f64, u2: f64, v2: f64) -> ModelResult<Plane> {
        let p1 = self.evaluate(kernel, u1, v1);
        let p2 = self.evaluate(kernel, u2, v2);
        let p3 = p1 + self.normal(kernel, u1, v1);
        Plane::by_points(&p1, &p2, &p3).ok_or(ModelError::DegeneratePlane)
    }

    /// Curve on the reference shape running from `S(u1, v1)` to `S(u2, v2)`.
    ///
    /// The curve is the section of `basis` (or, without one, of
    /// [`ReferenceSurface::extract_plane`]) with the reference shape. When
    /// the section falls apart into several wires, the one nearest to the
    /// first location is used. The result is trimmed to the two locations
    /// and its parameter increases from the first toward the second.
    pub fn extract_curve(
        &self,
        kernel: &K,
        u1: f64,
        v1: f64,
        u2: f64,
        v2: f64,
        basis: Option<&Geometry<K>>,
    ) -> ModelResult<K::Curve> {
        let p1 = self.evaluate(kernel, u1, v1);
        let p2 = self.evaluate(kernel, u2, v2);

        let basis_shape = match basis {
            Some(geometry) => geometry.to_shape(kernel),
            None => {
                let plane = self.extract_plane(kernel, u1, v1, u2, v2)?;
                kernel.face_from_surface(&kernel.plane_surface(&plane))
            }
        };

        let section = kernel.intersect(&basis_shape, &self.shape, true)?;
        let edges = kernel.edges(&section);
        let wires = kernel.wires_from_edges(&edges);
        debug!(edges = edges.len(), wires = wires.len(), "reference section");

        let wire = match wires.len() {
            0 => return Err(ModelError::NoIntersectionCurve),
            1 => &wires[0],
            _ => {
                let nearest = kernel
                    .nearest_shape(&p1, &wires)
                    .ok_or(ModelError::NoIntersectionCurve)?;
                debug!(selected = nearest, "picked wire nearest to the first location");
                &wires[nearest]
            }
        };

        let mut curve = kernel.wire_curve(wire)?;
        let mut t1 = kernel
            .project_point_to_curve(&curve, &p1)
            .ok_or(ModelError::EndpointProjectionFailure {
                endpoint: Endpoint::First,
            })?;
        let mut t2 = kernel
            .project_point_to_curve(&curve, &p2)
            .ok_or(ModelError::EndpointProjectionFailure {
                endpoint: Endpoint::Second,
            })?;

        if t1 > t2 {
            let (r1, r2) = (
                kernel.reversed_parameter(&curve, t1),
                kernel.reversed_parameter(&curve, t2),
            );
            kernel.reverse_curve(&mut curve);
            t1 = r1;
            t2 = r2;
            debug!(t1, t2, "reversed extracted curve");
        }

        Ok(kernel.trim_curve(&curve, t1, t2)?)
    }
}
