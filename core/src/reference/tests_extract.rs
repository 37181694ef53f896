use super::*;
use crate::error::Endpoint;
use crate::geometry::{Curve, CylindricalSurface, LineCurve, RuledSurface, Surface};
use crate::kernel::mock::MockKernel;
use crate::kernel::{Shape, TruckKernel};
use approx::assert_abs_diff_eq;

fn flat_patch() -> Surface {
    Surface::Ruled(RuledSurface::between_segments(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(4.0, 0.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
        Point3::new(4.0, 2.0, 0.0),
    ))
}

fn twisted_patch() -> Surface {
    Surface::Ruled(RuledSurface::between_segments(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(1.0, 20.0, 1.0),
        Point3::new(9.0, 20.0, -1.0),
    ))
}

fn line_wire(a: [f64; 3], b: [f64; 3]) -> Shape {
    Shape::Wire {
        edges: vec![Curve::Line(
            LineCurve::between(Point3::from(a), Point3::from(b)).unwrap(),
        )],
    }
}

#[test]
fn test_invert_round_trip() {
    let kernel = TruckKernel::new();
    let sref = ReferenceSurface::new(&kernel, twisted_patch(), SrefOptions::default());
    for &(u, v) in &[(0.1, 0.2), (0.5, 0.5), (0.8, 0.95)] {
        let p = sref.evaluate(&kernel, u, v);
        let (iu, iv) = sref.invert(&kernel, &p).unwrap();
        assert_abs_diff_eq!(sref.evaluate(&kernel, iu, iv), p, epsilon = 1e-6);
    }
}

#[test]
fn test_invert_reports_projection_failure() {
    let kernel = TruckKernel::new();
    let cyl = Surface::Cylinder(CylindricalSurface::new(Point3::origin(), Vector3::z(), 1.0, 2.0));
    let sref = ReferenceSurface::new(&kernel, cyl, SrefOptions::default());
    // every point of the axis is equidistant from the whole circle
    let err = sref.invert(&kernel, &Point3::new(0.0, 0.0, 1.0)).unwrap_err();
    assert_eq!(err, ModelError::ProjectionFailure { point: [0.0, 0.0, 1.0] });
}

#[test]
fn test_extract_curve_along_boundary_edge() {
    let kernel = TruckKernel::new();
    let sref = ReferenceSurface::new(&kernel, flat_patch(), SrefOptions::default());
    let curve = sref.extract_curve(&kernel, 0.0, 0.0, 1.0, 0.0, None).unwrap();
    let (a, b) = kernel.curve_bounds(&curve);
    assert_abs_diff_eq!(kernel.curve_eval(&curve, a), sref.evaluate(&kernel, 0.0, 0.0), epsilon = 1e-6);
    assert_abs_diff_eq!(kernel.curve_eval(&curve, b), sref.evaluate(&kernel, 1.0, 0.0), epsilon = 1e-6);
}

#[test]
fn test_extract_curve_orientation_follows_arguments() {
    let kernel = TruckKernel::new();
    let sref = ReferenceSurface::new(&kernel, twisted_patch(), SrefOptions::default());
    for &(u1, v1, u2, v2) in &[(0.2, 0.3, 0.8, 0.6), (0.8, 0.6, 0.2, 0.3)] {
        let curve = sref.extract_curve(&kernel, u1, v1, u2, v2, None).unwrap();
        let (a, b) = kernel.curve_bounds(&curve);
        assert!(a < b);
        assert_abs_diff_eq!(kernel.curve_eval(&curve, a), sref.evaluate(&kernel, u1, v1), epsilon = 1e-3);
        assert_abs_diff_eq!(kernel.curve_eval(&curve, b), sref.evaluate(&kernel, u2, v2), epsilon = 1e-3);
    }
}

#[test]
fn test_extract_curve_picks_branch_nearest_start() {
    // a plane through the axis cuts a cylinder along two opposite lines
    let kernel = TruckKernel::new();
    let cyl = Surface::Cylinder(CylindricalSurface::new(Point3::origin(), Vector3::z(), 1.0, 2.0));
    let sref = ReferenceSurface::new(&kernel, cyl, SrefOptions::default());
    let curve = sref.extract_curve(&kernel, 0.5, 0.5, 0.5, 1.5, None).unwrap();
    let (a, b) = kernel.curve_bounds(&curve);
    assert_abs_diff_eq!(kernel.curve_eval(&curve, a), sref.evaluate(&kernel, 0.5, 0.5), epsilon = 1e-6);
    assert_abs_diff_eq!(kernel.curve_eval(&curve, b), sref.evaluate(&kernel, 0.5, 1.5), epsilon = 1e-6);
}

#[test]
fn test_extract_curve_with_explicit_basis() {
    let kernel = TruckKernel::new();
    let sref = ReferenceSurface::new(&kernel, flat_patch(), SrefOptions::default());
    // vertical plane x = 1 crosses the patch along v
    let basis = Geometry::Surface(kernel.plane_surface(&Plane::yz(Point3::new(1.0, 0.0, 0.0))));
    let curve = sref
        .extract_curve(&kernel, 0.25, 0.9, 0.25, 0.1, Some(&basis))
        .unwrap();
    let (a, b) = kernel.curve_bounds(&curve);
    assert_abs_diff_eq!(kernel.curve_eval(&curve, a), Point3::new(1.0, 1.8, 0.0), epsilon = 1e-6);
    assert_abs_diff_eq!(kernel.curve_eval(&curve, b), Point3::new(1.0, 0.2, 0.0), epsilon = 1e-6);
}

#[test]
fn test_nearest_wire_independent_of_discovery_order() {
    let near = line_wire([0.0, 0.0, 0.1], [4.0, 0.0, 0.1]);
    let far = line_wire([0.0, 0.0, 0.5], [4.0, 0.0, 0.5]);

    for wires in [vec![near.clone(), far.clone()], vec![far, near]] {
        let kernel = MockKernel::new().with_section_wires(wires);
        let sref = ReferenceSurface::new(&kernel, flat_patch(), SrefOptions::default());
        let curve = sref.extract_curve(&kernel, 0.0, 0.0, 1.0, 0.0, None).unwrap();
        let (a, b) = kernel.curve_bounds(&curve);
        assert_abs_diff_eq!(kernel.curve_eval(&curve, a), Point3::new(0.0, 0.0, 0.1), epsilon = 1e-12);
        assert_abs_diff_eq!(kernel.curve_eval(&curve, b), Point3::new(4.0, 0.0, 0.1), epsilon = 1e-12);
    }
}

#[test]
fn test_equidistant_wires_keep_first_discovered() {
    let above = line_wire([0.0, 0.0, 0.1], [4.0, 0.0, 0.1]);
    let below = line_wire([0.0, 0.0, -0.1], [4.0, 0.0, -0.1]);

    for (wires, z) in [(vec![above.clone(), below.clone()], 0.1), (vec![below, above], -0.1)] {
        let kernel = MockKernel::new().with_section_wires(wires);
        let sref = ReferenceSurface::new(&kernel, flat_patch(), SrefOptions::default());
        let curve = sref.extract_curve(&kernel, 0.0, 0.0, 1.0, 0.0, None).unwrap();
        let (a, _) = kernel.curve_bounds(&curve);
        assert_abs_diff_eq!(kernel.curve_eval(&curve, a).z, z, epsilon = 1e-12);
    }
}

#[test]
fn test_zero_wires_is_an_error() {
    let kernel = MockKernel::new().with_section_wires(Vec::new());
    let sref = ReferenceSurface::new(&kernel, flat_patch(), SrefOptions::default());
    let err = sref.extract_curve(&kernel, 0.0, 0.0, 1.0, 0.0, None).unwrap_err();
    assert_eq!(err, ModelError::NoIntersectionCurve);
}

#[test]
fn test_endpoint_projection_failure_names_first_endpoint() {
    let kernel = MockKernel::new()
        .with_section_wires(vec![line_wire([0.0, 0.0, 0.0], [4.0, 0.0, 0.0])])
        .failing_curve_projection();
    let sref = ReferenceSurface::new(&kernel, flat_patch(), SrefOptions::default());
    let err = sref.extract_curve(&kernel, 0.0, 0.0, 1.0, 0.0, None).unwrap_err();
    assert_eq!(
        err,
        ModelError::EndpointProjectionFailure {
            endpoint: Endpoint::First
        }
    );
}

#[test]
fn test_endpoint_projection_failure_names_second_endpoint() {
    let kernel = MockKernel::new()
        .with_section_wires(vec![line_wire([0.0, 0.0, 0.0], [4.0, 0.0, 0.0])])
        .failing_curve_projection_near(Point3::new(4.0, 0.0, 0.0));
    let sref = ReferenceSurface::new(&kernel, flat_patch(), SrefOptions::default());
    let err = sref.extract_curve(&kernel, 0.0, 0.0, 1.0, 0.0, None).unwrap_err();
    assert_eq!(
        err,
        ModelError::EndpointProjectionFailure {
            endpoint: Endpoint::Second
        }
    );

    // the first location still projects, so the same request near the
    // start of the wire succeeds
    let curve = sref.extract_curve(&kernel, 0.0, 0.0, 0.5, 0.0, None).unwrap();
    assert_abs_diff_eq!(kernel.curve_eval(&curve, kernel.curve_bounds(&curve).0).x, 0.0, epsilon = 1e-9);
}

#[test]
fn test_extract_plane_rejects_coincident_locations() {
    let kernel = TruckKernel::new();
    let sref = ReferenceSurface::new(&kernel, flat_patch(), SrefOptions::default());
    assert_eq!(
        sref.extract_plane(&kernel, 0.5, 0.5, 0.5, 0.5).unwrap_err(),
        ModelError::DegeneratePlane
    );

    let plane = sref.extract_plane(&kernel, 0.0, 0.0, 1.0, 0.0).unwrap();
    assert!(plane.distance(&sref.evaluate(&kernel, 0.5, 0.0)) < 1e-9);
    assert!(plane.distance(&sref.evaluate(&kernel, 0.5, 1.0)) > 1.0);
}

#[test]
fn test_sref_accepts_surfaces_only() {
    let kernel = TruckKernel::new();
    let line = Curve::Line(LineCurve::between(Point3::origin(), Point3::new(1.0, 0.0, 0.0)).unwrap());
    let err = ReferenceSurface::from_geometry(&kernel, Geometry::Curve(line.clone()), SrefOptions::default())
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::UnsupportedGeometryType {
            expected: "surface",
            found: "curve"
        }
    );
    assert!(ReferenceCurve::from_geometry(&kernel, Geometry::Curve(line)).is_ok());
}

#[test]
fn test_derived_shape_follows_options() {
    let kernel = TruckKernel::new();
    let cyl = Surface::Cylinder(CylindricalSurface::new(Point3::origin(), Vector3::z(), 1.0, 2.0));

    let divided = ReferenceSurface::new(&kernel, cyl.clone(), SrefOptions::default());
    assert_eq!(divided.shape().faces().len(), 2);

    let whole = ReferenceSurface::new(
        &kernel,
        cyl,
        SrefOptions {
            divide_closed: false,
            divide_c0: true,
        },
    );
    assert_eq!(whole.shape().faces().len(), 1);
}

#[test]
fn test_mirrored_reference_is_independent() {
    let kernel = TruckKernel::new();
    let sref = ReferenceSurface::new(&kernel, twisted_patch(), SrefOptions::default());
    let mirror = Plane::xz(Point3::origin());
    let mirrored = sref.mirrored(&kernel, &mirror);
    let expected = mirror.mirror_point(&sref.evaluate(&kernel, 0.3, 0.4));
    assert_abs_diff_eq!(mirrored.evaluate(&kernel, 0.3, 0.4), expected, epsilon = 1e-12);
    assert_eq!(mirrored.shape().faces().len(), 1);
}
