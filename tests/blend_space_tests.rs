//! Blend Space Tests
//!
//! Tests for:
//! - 1D bracketing, clamping and interpolation
//! - 2D nearest-triangle selection, barycentric weights and the degenerate
//!   inverse-distance fallback
//! - Normalized-time sampling of entry clips
//! - Scratch exhaustion degrading to the rest pose

use std::sync::Arc;

use bumpalo::Bump;
use glam::{Affine3A, Vec2, Vec3};

use marionette::animation::blend_space::{BlendSpace1D, BlendSpace2D, MAX_BLEND_ENTRIES};
use marionette::animation::clip::{AnimationClip, Channel};
use marionette::animation::tracks::{InterpolationMode, KeyframeTrack};
use marionette::{AnimationError, EvaluationSettings, JointTransform, Skeleton};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn vec3_approx(a: Vec3, b: Vec3) -> bool {
    approx(a.x, b.x) && approx(a.y, b.y) && approx(a.z, b.z)
}

const REST_TRANSLATION: Vec3 = Vec3::new(0.0, -7.0, 0.0);

fn single_joint_skeleton() -> Skeleton {
    let mut skeleton = Skeleton::new("single");
    skeleton
        .add_joint(
            "root",
            None,
            JointTransform::from_translation(REST_TRANSLATION),
            Affine3A::IDENTITY,
        )
        .unwrap();
    skeleton
}

/// One-second clip holding joint 0 at `translation`.
fn pose_clip(name: &str, translation: Vec3) -> Arc<AnimationClip> {
    Arc::new(AnimationClip::new(
        name,
        vec![Channel::translation(
            0,
            KeyframeTrack::new(
                vec![0.0, 1.0],
                vec![translation, translation],
                InterpolationMode::Linear,
            ),
        )],
    ))
}

fn evaluate_1d(space: &BlendSpace1D, skeleton: &Skeleton, value: f32) -> Vec3 {
    let arena = Bump::new();
    let mut out = [JointTransform::IDENTITY];
    space
        .evaluate(skeleton, value, 0.0, &arena, &EvaluationSettings::default(), &mut out)
        .unwrap();
    out[0].translation
}

fn evaluate_2d(space: &BlendSpace2D, skeleton: &Skeleton, point: Vec2) -> Vec3 {
    let arena = Bump::new();
    let mut out = [JointTransform::IDENTITY];
    space
        .evaluate(skeleton, point, 0.0, &arena, &EvaluationSettings::default(), &mut out)
        .unwrap();
    out[0].translation
}

fn walk_run_space() -> BlendSpace1D {
    BlendSpace1D::new(0)
        .with_entry(3.0, pose_clip("sprint", Vec3::X * 30.0))
        .unwrap()
        .with_entry(0.0, pose_clip("idle", Vec3::ZERO))
        .unwrap()
        .with_entry(1.0, pose_clip("walk", Vec3::X * 10.0))
        .unwrap()
}

/// Unit square: A(0,0) B(1,0) C(0,1) D(1,1).
fn square_space() -> BlendSpace2D {
    BlendSpace2D::new(0, 1)
        .with_entry(Vec2::new(0.0, 0.0), pose_clip("a", Vec3::ZERO))
        .unwrap()
        .with_entry(Vec2::new(1.0, 0.0), pose_clip("b", Vec3::X * 4.0))
        .unwrap()
        .with_entry(Vec2::new(0.0, 1.0), pose_clip("c", Vec3::Y * 4.0))
        .unwrap()
        .with_entry(Vec2::new(1.0, 1.0), pose_clip("d", Vec3::Z * 4.0))
        .unwrap()
}

// ============================================================================
// 1D
// ============================================================================

#[test]
fn blend_1d_entries_sorted_on_insert() {
    let space = walk_run_space();
    let positions: Vec<f32> = space.entries().iter().map(|e| e.position).collect();
    assert_eq!(positions, vec![0.0, 1.0, 3.0]);
}

#[test]
fn blend_1d_bracket_midpoint_and_clamping() {
    let space = walk_run_space();

    assert_eq!(space.bracket(0.5, 1e-6), Some((0, 1, 0.5)));
    assert_eq!(space.bracket(-5.0, 1e-6), Some((0, 1, 0.0)));
    assert_eq!(space.bracket(99.0, 1e-6), Some((1, 2, 1.0)));
    assert_eq!(space.bracket(2.0, 1e-6), Some((1, 2, 0.5)));
}

#[test]
fn blend_1d_evaluate_interpolates() {
    let skeleton = single_joint_skeleton();
    let space = walk_run_space();

    assert!(vec3_approx(evaluate_1d(&space, &skeleton, 0.5), Vec3::X * 5.0));
    assert!(vec3_approx(evaluate_1d(&space, &skeleton, 2.0), Vec3::X * 20.0));
}

#[test]
fn blend_1d_evaluate_clamps_outside_range() {
    let skeleton = single_joint_skeleton();
    let space = walk_run_space();

    assert!(vec3_approx(evaluate_1d(&space, &skeleton, -3.0), Vec3::ZERO));
    assert!(vec3_approx(evaluate_1d(&space, &skeleton, 10.0), Vec3::X * 30.0));
}

#[test]
fn blend_1d_empty_writes_rest_pose() {
    let skeleton = single_joint_skeleton();
    let space = BlendSpace1D::new(0);
    assert_eq!(evaluate_1d(&space, &skeleton, 0.5), REST_TRANSLATION);
}

#[test]
fn blend_1d_single_entry_ignores_parameter() {
    let skeleton = single_joint_skeleton();
    let space = BlendSpace1D::new(0)
        .with_entry(2.0, pose_clip("only", Vec3::Z))
        .unwrap();

    assert_eq!(evaluate_1d(&space, &skeleton, -100.0), Vec3::Z);
    assert_eq!(evaluate_1d(&space, &skeleton, 100.0), Vec3::Z);
}

#[test]
fn blend_1d_coincident_positions_pick_lower() {
    let space = BlendSpace1D::new(0)
        .with_entry(1.0, pose_clip("first", Vec3::X))
        .unwrap()
        .with_entry(1.0, pose_clip("second", Vec3::Y))
        .unwrap();

    let (lo, _, factor) = space.bracket(1.0, 1e-6).unwrap();
    assert_eq!(lo, 0);
    assert_eq!(factor, 0.0);
    assert_eq!(space.entries()[0].clip.name, "first");
}

#[test]
fn blend_1d_samples_at_normalized_time() {
    let skeleton = single_joint_skeleton();
    let long_clip = Arc::new(AnimationClip::new(
        "two_seconds",
        vec![Channel::translation(
            0,
            KeyframeTrack::new(
                vec![0.0, 2.0],
                vec![Vec3::ZERO, Vec3::X * 2.0],
                InterpolationMode::Linear,
            ),
        )],
    ));
    let space = BlendSpace1D::new(0).with_entry(0.0, long_clip).unwrap();

    let arena = Bump::new();
    let mut out = [JointTransform::IDENTITY];
    space
        .evaluate(&skeleton, 0.0, 0.5, &arena, &EvaluationSettings::default(), &mut out)
        .unwrap();

    // 50% of a 2s clip is t = 1s
    assert!(vec3_approx(out[0].translation, Vec3::X));
    assert!(approx(space.duration(), 2.0));
}

#[test]
fn blend_1d_capacity_is_enforced() {
    let mut space = BlendSpace1D::new(0);
    for i in 0..MAX_BLEND_ENTRIES {
        space.add_entry(i as f32, pose_clip("e", Vec3::ZERO)).unwrap();
    }
    let err = space.add_entry(100.0, pose_clip("overflow", Vec3::ZERO)).unwrap_err();
    assert!(matches!(err, AnimationError::CapacityExceeded { .. }));
    assert_eq!(space.entries().len(), MAX_BLEND_ENTRIES);
}

// ============================================================================
// 2D
// ============================================================================

#[test]
fn blend_2d_at_sample_point_gives_full_weight() {
    let space = square_space();
    let weights = space.triangle_weights(Vec2::new(1.0, 0.0), 1e-6).unwrap();

    // B is entry 1 and must carry all of the weight.
    assert_eq!(weights[0].0, 1);
    assert!(approx(weights[0].1, 1.0));
    assert!(approx(weights[1].1, 0.0));
    assert!(approx(weights[2].1, 0.0));
}

#[test]
fn blend_2d_at_sample_point_returns_its_pose() {
    let skeleton = single_joint_skeleton();
    let space = square_space();

    assert!(vec3_approx(evaluate_2d(&space, &skeleton, Vec2::new(0.0, 1.0)), Vec3::Y * 4.0));
    assert!(vec3_approx(evaluate_2d(&space, &skeleton, Vec2::new(1.0, 1.0)), Vec3::Z * 4.0));
}

#[test]
fn blend_2d_nearest_ties_keep_scan_order() {
    let space = square_space();
    // From B: A and D are both at distance 1; A is scanned first.
    assert_eq!(space.nearest_three(Vec2::new(1.0, 0.0)), Some([1, 0, 3]));
}

#[test]
fn blend_2d_interior_point_barycentric() {
    let skeleton = single_joint_skeleton();
    let space = square_space();
    let point = Vec2::new(0.25, 0.25);

    let weights = space.triangle_weights(point, 1e-6).unwrap();
    assert_eq!([weights[0].0, weights[1].0, weights[2].0], [0, 1, 2]);
    assert!(approx(weights[0].1, 0.5));
    assert!(approx(weights[1].1, 0.25));
    assert!(approx(weights[2].1, 0.25));

    // 0.5 * A + 0.25 * B + 0.25 * C
    assert!(vec3_approx(evaluate_2d(&space, &skeleton, point), Vec3::new(1.0, 1.0, 0.0)));
}

#[test]
fn blend_2d_weights_are_non_negative_and_normalized() {
    let space = square_space();
    for point in [
        Vec2::new(-2.0, 0.3),
        Vec2::new(0.9, 0.1),
        Vec2::new(3.0, 3.0),
        Vec2::new(0.5, -1.0),
    ] {
        let weights = space.triangle_weights(point, 1e-6).unwrap();
        let sum: f32 = weights.iter().map(|(_, w)| *w).sum();
        assert!(weights.iter().all(|(_, w)| *w >= 0.0), "{point}: {weights:?}");
        assert!(approx(sum, 1.0), "{point}: sum {sum}");
    }
}

#[test]
fn blend_2d_degenerate_triangle_uses_inverse_distance() {
    let space = BlendSpace2D::new(0, 1)
        .with_entry(Vec2::new(0.0, 0.0), pose_clip("a", Vec3::ZERO))
        .unwrap()
        .with_entry(Vec2::new(1.0, 0.0), pose_clip("b", Vec3::X))
        .unwrap()
        .with_entry(Vec2::new(2.0, 0.0), pose_clip("c", Vec3::Y))
        .unwrap();

    let weights = space.triangle_weights(Vec2::new(0.5, 1.0), 1e-6).unwrap();
    let sum: f32 = weights.iter().map(|(_, w)| *w).sum();

    assert!(weights.iter().all(|(_, w)| w.is_finite() && *w > 0.0), "{weights:?}");
    assert!(approx(sum, 1.0));
    // A and B are equidistant from the point.
    assert!(approx(weights[0].1, weights[1].1));
    assert!(weights[2].1 < weights[0].1);
}

#[test]
fn blend_2d_two_entries_project_onto_segment() {
    let skeleton = single_joint_skeleton();
    let space = BlendSpace2D::new(0, 1)
        .with_entry(Vec2::ZERO, pose_clip("a", Vec3::ZERO))
        .unwrap()
        .with_entry(Vec2::new(2.0, 0.0), pose_clip("b", Vec3::X * 10.0))
        .unwrap();

    assert!(vec3_approx(evaluate_2d(&space, &skeleton, Vec2::new(1.0, 5.0)), Vec3::X * 5.0));
    assert!(vec3_approx(evaluate_2d(&space, &skeleton, Vec2::new(-4.0, 0.0)), Vec3::ZERO));
}

#[test]
fn blend_2d_empty_and_single() {
    let skeleton = single_joint_skeleton();

    let empty = BlendSpace2D::new(0, 1);
    assert_eq!(evaluate_2d(&empty, &skeleton, Vec2::ONE), REST_TRANSLATION);

    let single = BlendSpace2D::new(0, 1)
        .with_entry(Vec2::new(5.0, 5.0), pose_clip("only", Vec3::Z))
        .unwrap();
    assert_eq!(evaluate_2d(&single, &skeleton, Vec2::ZERO), Vec3::Z);
}

// ============================================================================
// Scratch exhaustion
// ============================================================================

#[test]
fn blend_space_scratch_exhaustion_degrades_to_rest() {
    let skeleton = single_joint_skeleton();
    let arena = Bump::new();
    arena.set_allocation_limit(Some(0));

    let mut out = [JointTransform::IDENTITY];
    let err = walk_run_space()
        .evaluate(&skeleton, 0.5, 0.0, &arena, &EvaluationSettings::default(), &mut out)
        .unwrap_err();
    assert!(matches!(err, AnimationError::ScratchExhausted { .. }));
    assert_eq!(out[0].translation, REST_TRANSLATION);

    let settings = EvaluationSettings::default();
    let err = square_space()
        .evaluate(&skeleton, Vec2::splat(0.25), 0.0, &arena, &settings, &mut out)
        .unwrap_err();
    assert!(matches!(err, AnimationError::ScratchExhausted { .. }));
    assert_eq!(out[0].translation, REST_TRANSLATION);
}

#[test]
fn blend_space_at_bracket_endpoint_needs_no_scratch() {
    let skeleton = single_joint_skeleton();
    let arena = Bump::new();
    arena.set_allocation_limit(Some(0));

    let mut out = [JointTransform::IDENTITY];
    walk_run_space()
        .evaluate(&skeleton, 0.0, 0.0, &arena, &EvaluationSettings::default(), &mut out)
        .unwrap();
    assert_eq!(out[0].translation, Vec3::ZERO);
}
