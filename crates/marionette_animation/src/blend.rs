//! Pose Blending
//!
//! All blenders write into their first argument, so a running composite can be
//! folded layer by layer without extra scratch poses. Slices are processed up
//! to the shorter length.

use glam::Quat;
use marionette_core::{JointTransform, align_hemisphere, slerp_shortest};

use crate::mask::BoneMask;

/// `base = lerp(base, other, factor)` per joint.
///
/// `factor <= 0` leaves `base` untouched; `factor >= 1` copies `other`.
pub fn blend(base: &mut [JointTransform], other: &[JointTransform], factor: f32) {
    if factor <= 0.0 {
        return;
    }
    if factor >= 1.0 {
        let n = base.len().min(other.len());
        base[..n].copy_from_slice(&other[..n]);
        return;
    }

    for (b, o) in base.iter_mut().zip(other) {
        *b = b.interpolate(o, factor);
    }
}

/// Blend with a per-joint weight of `mask[joint] * factor`.
///
/// Joints whose effective weight is at or below `epsilon` are left exactly as
/// in `base`; no quaternion work is done for them.
pub fn blend_masked(
    base: &mut [JointTransform],
    overlay: &[JointTransform],
    mask: &BoneMask,
    factor: f32,
    epsilon: f32,
) {
    for (i, (b, o)) in base.iter_mut().zip(overlay).enumerate() {
        let w = mask.weight(i) * factor;
        if w <= epsilon {
            continue;
        }
        *b = b.interpolate(o, w);
    }
}

/// Adds the difference `additive - reference` on top of `base`.
///
/// Translation and scale are offset linearly. Rotation applies the delta
/// `inverse(reference) * additive`, scaled by slerping from identity, as a
/// right-multiplication of the base rotation.
pub fn blend_additive(
    base: &mut [JointTransform],
    additive: &[JointTransform],
    reference: &[JointTransform],
    mask: Option<&BoneMask>,
    weight: f32,
    epsilon: f32,
) {
    for (i, ((b, a), r)) in base.iter_mut().zip(additive).zip(reference).enumerate() {
        let w = match mask {
            Some(mask) => mask.weight(i) * weight,
            None => weight,
        };
        if w <= epsilon {
            continue;
        }

        b.translation += (a.translation - r.translation) * w;
        b.scale += (a.scale - r.scale) * w;

        let delta = align_hemisphere(Quat::IDENTITY, r.rotation.inverse() * a.rotation);
        let weighted = slerp_shortest(Quat::IDENTITY, delta, w);
        b.rotation = (b.rotation * weighted).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_blend_midpoint_translation() {
        let mut base = [JointTransform::from_translation(Vec3::ZERO)];
        let other = [JointTransform::from_translation(Vec3::new(2.0, 0.0, 0.0))];
        blend(&mut base, &other, 0.5);
        assert!((base[0].translation.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_additive_zero_weight_is_noop() {
        let start = [JointTransform::from_rotation(Quat::from_rotation_x(0.3))];
        let mut base = start;
        let additive = [JointTransform::from_rotation(Quat::from_rotation_y(1.0))];
        let reference = [JointTransform::IDENTITY];
        blend_additive(&mut base, &additive, &reference, None, 0.0, 1e-4);
        assert_eq!(base, start);
    }
}
