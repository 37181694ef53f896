use super::*;
use crate::geometry::{Curve, LineCurve, PlaneSurface, RuledSurface, Surface};
use crate::kernel::mock::MockKernel;
use crate::kernel::{KernelOpError, Shape, TruckKernel};
use approx::assert_abs_diff_eq;

fn plane_surface() -> Surface {
    Surface::Plane(PlaneSurface::new(
        Plane::xy(Point3::origin()),
        ParamRect::new(0.0, 4.0, 0.0, 1.0),
    ))
}

fn tile(u1: f64, u2: f64) -> Shape {
    Shape::Face {
        surface: plane_surface(),
        window: ParamRect::new(u1, u2, 0.0, 1.0),
    }
}

fn box_shape(kernel: &TruckKernel, origin: [f64; 3]) -> Shape {
    kernel
        .make_box(Point3::from(origin), Vector3::new(2.0, 2.0, 2.0))
        .unwrap()
}

fn patch() -> Surface {
    Surface::Ruled(RuledSurface::between_segments(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(4.0, 0.0, 0.0),
        Point3::new(0.0, 2.0, 0.0),
        Point3::new(4.0, 2.0, 0.0),
    ))
}

fn line(a: [f64; 3], b: [f64; 3]) -> Curve {
    Curve::Line(LineCurve::between(Point3::from(a), Point3::from(b)).unwrap())
}

#[test]
fn test_identities_are_unique_and_increasing() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let a = EntityBuilder::<TruckKernel>::body("wing").build(&kernel, &ids).unwrap();
    let b = EntityBuilder::<TruckKernel>::part("spar").build(&kernel, &ids).unwrap();
    assert!(a.id() < b.id());
    assert_ne!(a.color(), b.color());
    assert_eq!(b.kind(), EntityKind::Part);
}

#[test]
fn test_failed_build_consumes_no_identity() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let first = EntityBuilder::<TruckKernel>::part("a").build(&kernel, &ids).unwrap();

    let err = EntityBuilder::<TruckKernel>::part("b")
        .with_sref(Geometry::Curve(line([0.0; 3], [1.0, 0.0, 0.0])), SrefOptions::default())
        .build(&kernel, &ids)
        .unwrap_err();
    assert!(matches!(err, ModelError::UnsupportedGeometryType { .. }));

    let second = EntityBuilder::<TruckKernel>::part("c").build(&kernel, &ids).unwrap();
    assert_eq!(second.id().value(), first.id().value() + 1);
}

#[test]
fn test_entity_built_without_shape_takes_one_later() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let mut rib = EntityBuilder::<TruckKernel>::part("rib").build(&kernel, &ids).unwrap();
    assert!(rib.is_null());
    assert!(!rib.check(&kernel));
    assert_eq!(rib.bounding_box(&kernel, None).unwrap_err(), ModelError::NullShape);

    let id = rib.id();
    rib.set_shape(box_shape(&kernel, [0.0, 0.0, 0.0]));
    assert!(!rib.is_null());
    assert!(rib.check(&kernel));
    assert_eq!(rib.id(), id);
}

#[test]
fn test_set_sref_rejects_curve_and_keeps_previous() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let mut part = EntityBuilder::<TruckKernel>::part("rib")
        .with_sref(Geometry::Surface(patch()), SrefOptions::default())
        .build(&kernel, &ids)
        .unwrap();
    let before = part.seval(&kernel, 0.5, 0.5).unwrap();

    let err = part
        .set_sref(&kernel, Geometry::Curve(line([0.0; 3], [1.0, 0.0, 0.0])), SrefOptions::default())
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::UnsupportedGeometryType {
            expected: "surface",
            found: "curve"
        }
    );
    assert_abs_diff_eq!(part.seval(&kernel, 0.5, 0.5).unwrap(), before, epsilon = 1e-12);
}

#[test]
fn test_missing_references_are_reported() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let part = EntityBuilder::<TruckKernel>::part("skin").build(&kernel, &ids).unwrap();
    assert!(matches!(
        part.seval(&kernel, 0.0, 0.0),
        Err(ModelError::MissingReference { which: "surface", .. })
    ));
    assert!(matches!(part.p1(&kernel), Err(ModelError::MissingReference { which: "curve", .. })));
    assert_eq!(part.bounding_box(&kernel, None).unwrap_err(), ModelError::NullShape);
}

#[test]
fn test_cref_endpoints() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let frame = EntityBuilder::<TruckKernel>::part("frame")
        .with_cref(Geometry::Curve(line([0.0, 0.0, 0.0], [0.0, 10.0, 0.0])))
        .build(&kernel, &ids)
        .unwrap();
    assert_abs_diff_eq!(frame.p1(&kernel).unwrap(), Point3::origin(), epsilon = 1e-12);
    assert_abs_diff_eq!(frame.p2(&kernel).unwrap(), Point3::new(0.0, 10.0, 0.0), epsilon = 1e-12);
    let u = frame.invert_cref(&kernel, &Point3::new(1.0, 4.0, 0.0)).unwrap();
    assert_abs_diff_eq!(frame.ceval(&kernel, u).unwrap(), Point3::new(0.0, 4.0, 0.0), epsilon = 1e-9);
}

#[test]
fn test_nullify_keeps_metadata_and_references() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let mut spar = EntityBuilder::part("spar")
        .with_shape(tile(0.0, 1.0))
        .with_sref(Geometry::Surface(patch()), SrefOptions::default())
        .with_metadata("station", 1.5)
        .build(&kernel, &ids)
        .unwrap();
    assert!(spar.check(&kernel));

    assert!(spar.nullify().is_some());
    assert!(spar.is_null());
    assert!(!spar.check(&kernel));
    assert_eq!(spar.get_metadata("station"), Some(&serde_json::json!(1.5)));
    assert!(spar.has_sref());
}

#[test]
fn test_merge_with_null_operand_changes_nothing() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let mut skin = EntityBuilder::part("skin")
        .with_shape(tile(0.0, 1.0))
        .build(&kernel, &ids)
        .unwrap();
    let empty = EntityBuilder::<TruckKernel>::part("empty").build(&kernel, &ids).unwrap();

    let outcome = skin.merge(&kernel, &empty, true);
    assert_eq!(outcome, BooleanOutcome::Failed(BooleanFailure::NullOperand));
    assert!(!outcome.mutated());
    assert_eq!(skin.shape().unwrap().faces().len(), 1);

    let mut receiver = EntityBuilder::<TruckKernel>::part("nothing").build(&kernel, &ids).unwrap();
    let outcome = receiver.cut(&kernel, &skin);
    assert_eq!(outcome.failure(), Some(&BooleanFailure::NullReceiver));
    assert!(receiver.is_null());
}

#[test]
fn test_merge_unifies_adjacent_faces() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let mut skin = EntityBuilder::part("skin")
        .with_shape(tile(0.0, 1.0))
        .build(&kernel, &ids)
        .unwrap();
    let other = tile(1.0, 2.0);

    assert!(skin.merge(&kernel, Operand::Shape(&other), true).succeeded());
    let faces = skin.shape().unwrap().faces();
    assert_eq!(faces.len(), 1);
    assert_abs_diff_eq!(faces[0].1.u2, 2.0, epsilon = 1e-12);
}

#[test]
fn test_failed_fuse_leaves_shape_untouched() {
    let kernel = MockKernel::new().failing_fuse();
    let ids = IdGenerator::new();
    let mut skin = EntityBuilder::part("skin")
        .with_shape(tile(0.0, 1.0))
        .build(&kernel, &ids)
        .unwrap();
    let other = tile(1.0, 2.0);

    let outcome = skin.merge(&kernel, Operand::Shape(&other), true);
    assert!(matches!(
        outcome,
        BooleanOutcome::Failed(BooleanFailure::Kernel(KernelOpError::OperationFailed(_)))
    ));
    let faces = skin.shape().unwrap().faces();
    assert_eq!(faces.len(), 1);
    assert_abs_diff_eq!(faces[0].1.u2, 1.0, epsilon = 1e-12);
}

#[test]
fn test_failed_unify_keeps_fused_shape() {
    let kernel = MockKernel::new().failing_unify();
    let ids = IdGenerator::new();
    let mut skin = EntityBuilder::part("skin")
        .with_shape(tile(0.0, 1.0))
        .build(&kernel, &ids)
        .unwrap();
    let other = tile(1.0, 2.0);

    let outcome = skin.merge(&kernel, Operand::Shape(&other), true);
    assert!(matches!(outcome, BooleanOutcome::AppliedWithoutUnify(_)));
    assert!(outcome.mutated());
    assert!(!outcome.succeeded());
    assert_eq!(skin.shape().unwrap().faces().len(), 2);

    // without unification the mock's failure never triggers
    let mut plain = EntityBuilder::part("plain")
        .with_shape(tile(0.0, 1.0))
        .build(&kernel, &ids)
        .unwrap();
    assert!(plain.merge(&kernel, Operand::Shape(&other), false).succeeded());
}

#[test]
fn test_cut_of_faces_is_reported_not_applied() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let mut skin = EntityBuilder::part("skin")
        .with_shape(tile(0.0, 1.0))
        .build(&kernel, &ids)
        .unwrap();
    let tool = Geometry::Surface(plane_surface());
    let outcome = skin.cut(&kernel, Operand::Geometry(&tool));
    assert!(matches!(
        outcome,
        BooleanOutcome::Failed(BooleanFailure::Kernel(KernelOpError::NotImplemented(_)))
    ));
    assert_eq!(skin.shape().unwrap().faces().len(), 1);
}

#[test]
fn test_split_both_updates_receiver_and_tool() {
    let mock = MockKernel::new();
    let kernel = mock.truck();
    let ids = IdGenerator::new();
    let mut left = EntityBuilder::body("left")
        .with_shape(box_shape(kernel, [0.0, 0.0, 0.0]))
        .build(kernel, &ids)
        .unwrap();
    let mut right = EntityBuilder::body("right")
        .with_shape(box_shape(kernel, [1.0, 0.5, 0.5]))
        .build(kernel, &ids)
        .unwrap();

    assert!(left.split(kernel, &mut right, true).succeeded());
    for entity in [&left, &right] {
        match entity.shape().unwrap() {
            Shape::Compound(pieces) => assert_eq!(pieces.len(), 2),
            other => panic!("expected split pieces, got {}", other.kind_name()),
        }
    }
}

#[test]
fn test_failed_split_changes_neither_entity() {
    let kernel = MockKernel::new().failing_split();
    let ids = IdGenerator::new();
    let mut left = EntityBuilder::body("left")
        .with_shape(box_shape(kernel.truck(), [0.0, 0.0, 0.0]))
        .build(&kernel, &ids)
        .unwrap();
    let mut right = EntityBuilder::body("right")
        .with_shape(box_shape(kernel.truck(), [1.0, 0.5, 0.5]))
        .build(&kernel, &ids)
        .unwrap();

    let outcome = left.split(&kernel, &mut right, true);
    assert!(!outcome.mutated());
    assert!(matches!(left.shape(), Some(Shape::Solid(_))));
    assert!(matches!(right.shape(), Some(Shape::Solid(_))));
}

#[test]
fn test_mirrored_entity_is_independent() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let mut wing = EntityBuilder::body("wing")
        .with_shape(box_shape(&kernel, [1.0, 0.0, 0.0]))
        .with_sref(Geometry::Surface(patch()), SrefOptions::default())
        .with_metadata("side", "right")
        .build(&kernel, &ids)
        .unwrap();
    let spar = EntityBuilder::part("spar")
        .with_shape(tile(0.0, 1.0))
        .build(&kernel, &ids)
        .unwrap();
    wing.add_subpart(spar);

    let mirror = Plane::yz(Point3::origin());
    let left = wing.mirrored(&kernel, &ids, &mirror, Some("left wing")).unwrap();
    assert_eq!(left.label(), "left wing");
    assert!(left.id() > wing.id());
    assert_ne!(left.color(), wing.color());

    let bbox = left.bounding_box(&kernel, None).unwrap();
    assert_abs_diff_eq!(bbox.min.x, -3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(bbox.max.x, -1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(left.seval(&kernel, 1.0, 0.0).unwrap(), Point3::new(-4.0, 0.0, 0.0), epsilon = 1e-12);

    let mirrored_spar = left.get_subpart("spar").unwrap();
    assert_ne!(mirrored_spar.id(), wing.get_subpart("spar").unwrap().id());

    // the source stays where it was
    let bbox = wing.bounding_box(&kernel, Some(0.5)).unwrap();
    assert_abs_diff_eq!(bbox.min.x, 0.5, epsilon = 1e-6);
}

#[test]
fn test_subparts_are_keyed_by_label() {
    let kernel = TruckKernel::new();
    let ids = IdGenerator::new();
    let mut wing = EntityBuilder::<TruckKernel>::body("wing").build(&kernel, &ids).unwrap();
    let first = EntityBuilder::<TruckKernel>::part("rib").build(&kernel, &ids).unwrap();
    let second = EntityBuilder::<TruckKernel>::part("rib").build(&kernel, &ids).unwrap();
    let second_id = second.id();

    assert!(wing.add_subpart(first).is_none());
    assert!(wing.add_subpart(second).is_some());
    assert_eq!(wing.subparts().count(), 1);
    assert_eq!(wing.get_subpart("rib").unwrap().id(), second_id);

    wing.get_subpart_mut("rib").unwrap().set_label("rib 1");
    assert!(wing.remove_subpart("rib").is_some());
    assert!(wing.get_subpart("rib").is_none());
}

#[test]
fn test_failed_cut_leaves_solid_untouched() {
    let kernel = MockKernel::new().failing_cut();
    let ids = IdGenerator::new();
    let mut block = EntityBuilder::body("block")
        .with_shape(box_shape(kernel.truck(), [0.0, 0.0, 0.0]))
        .build(&kernel, &ids)
        .unwrap();
    let tool = box_shape(kernel.truck(), [1.0, 0.5, 0.5]);

    let outcome = block.cut(&kernel, Operand::Shape(&tool));
    assert!(matches!(outcome, BooleanOutcome::Failed(BooleanFailure::Kernel(_))));
    let bbox = block.bounding_box(&kernel, None).unwrap();
    assert_abs_diff_eq!(bbox.max.x, 2.0, epsilon = 1e-6);
}
