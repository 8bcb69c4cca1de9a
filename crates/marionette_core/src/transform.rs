use glam::{Affine3A, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Local joint transform (TRS), relative to the parent joint.
///
/// This is the unit every pose is made of: one `JointTransform` per skeleton
/// joint. It is `Copy` so poses can live in bump-allocated slices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for JointTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl JointTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Builds the local matrix (scale, then rotation, then translation).
    #[inline]
    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Per-component interpolation: lerp for translation/scale, shortest-path
    /// slerp for rotation. The endpoints are returned verbatim.
    #[inline]
    #[must_use]
    pub fn interpolate(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 {
            return *other;
        }
        Self {
            translation: self.translation.lerp(other.translation, t),
            rotation: slerp_shortest(self.rotation, other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }
}

// ============================================================================
// Quaternion helpers
// ============================================================================

/// Flips `q` into the same hemisphere as `reference`.
///
/// `q` and `-q` encode the same rotation; interpolating toward the one with a
/// negative dot product would take the long way around.
#[inline]
#[must_use]
pub fn align_hemisphere(reference: Quat, q: Quat) -> Quat {
    if reference.dot(q) < 0.0 { -q } else { q }
}

/// Spherical interpolation that always travels the shorter arc.
#[inline]
#[must_use]
pub fn slerp_shortest(from: Quat, to: Quat, t: f32) -> Quat {
    from.slerp(align_hemisphere(from, to), t)
}
