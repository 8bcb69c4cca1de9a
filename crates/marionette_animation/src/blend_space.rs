//! Blend Spaces
//!
//! Parametric arrangements of clips. A 1D space places clips on a line and
//! cross-fades the two that bracket the driving parameter; a 2D space places
//! them in a plane and mixes the three nearest with barycentric weights.
//!
//! Entry clips are sampled at the shared *normalized* time scaled by their own
//! duration, so clips of different lengths stay phase-aligned.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use marionette_core::{
    AnimationError, EvaluationSettings, JointTransform, Result, ScratchAllocator, Skeleton,
};
use smallvec::SmallVec;

use crate::blend::blend;
use crate::clip::AnimationClip;
use crate::pose::{evaluate_clip, write_rest_pose};

/// Maximum number of clips in one blend space.
pub const MAX_BLEND_ENTRIES: usize = 16;

#[derive(Debug, Clone)]
pub struct BlendEntry1D {
    pub position: f32,
    pub clip: Arc<AnimationClip>,
}

#[derive(Debug, Clone)]
pub struct BlendEntry2D {
    pub position: Vec2,
    pub clip: Arc<AnimationClip>,
}

#[inline]
fn sample_entry(
    skeleton: &Skeleton,
    clip: &AnimationClip,
    normalized_time: f32,
    out: &mut [JointTransform],
) {
    evaluate_clip(skeleton, clip, normalized_time * clip.duration, out);
}

fn exhausted(skeleton: &Skeleton, out: &mut [JointTransform]) -> AnimationError {
    write_rest_pose(skeleton, out);
    AnimationError::ScratchExhausted {
        requested: skeleton.joint_count(),
    }
}

// ============================================================================
// 1D
// ============================================================================

#[derive(Debug, Clone)]
pub struct BlendSpace1D {
    /// Index of the float parameter driving the space.
    pub parameter: usize,
    entries: SmallVec<[BlendEntry1D; 8]>,
}

impl BlendSpace1D {
    #[must_use]
    pub fn new(parameter: usize) -> Self {
        Self {
            parameter,
            entries: SmallVec::new(),
        }
    }

    /// Inserts a clip at `position`, keeping entries sorted. Equal positions
    /// keep insertion order.
    pub fn add_entry(&mut self, position: f32, clip: Arc<AnimationClip>) -> Result<()> {
        if self.entries.len() >= MAX_BLEND_ENTRIES {
            return Err(AnimationError::CapacityExceeded {
                table: "1D blend space entries",
                capacity: MAX_BLEND_ENTRIES,
            });
        }
        let at = self.entries.partition_point(|e| e.position <= position);
        self.entries.insert(at, BlendEntry1D { position, clip });
        Ok(())
    }

    pub fn with_entry(mut self, position: f32, clip: Arc<AnimationClip>) -> Result<Self> {
        self.add_entry(position, clip)?;
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[BlendEntry1D] {
        &self.entries
    }

    /// Longest entry clip; used as the state's duration.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.entries.iter().map(|e| e.clip.duration).fold(0.0, f32::max)
    }

    /// Bracketing entries `(lower, upper, factor)` for `value`, after clamping
    /// it to the covered range. `None` with fewer than two entries.
    #[must_use]
    pub fn bracket(&self, value: f32, epsilon: f32) -> Option<(usize, usize, f32)> {
        let n = self.entries.len();
        if n < 2 {
            return None;
        }

        let min = self.entries[0].position;
        let max = self.entries[n - 1].position;
        let value = if value.is_nan() { min } else { value.clamp(min, max) };

        let mut lower = n - 2;
        for i in 0..n - 1 {
            if value <= self.entries[i + 1].position {
                lower = i;
                break;
            }
        }

        let p0 = self.entries[lower].position;
        let p1 = self.entries[lower + 1].position;
        let width = p1 - p0;
        let factor = if width > epsilon {
            ((value - p0) / width).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Some((lower, lower + 1, factor))
    }

    pub fn evaluate<S: ScratchAllocator + ?Sized>(
        &self,
        skeleton: &Skeleton,
        value: f32,
        normalized_time: f32,
        scratch: &S,
        settings: &EvaluationSettings,
        out: &mut [JointTransform],
    ) -> Result<()> {
        match self.entries.len() {
            0 => write_rest_pose(skeleton, out),
            1 => sample_entry(skeleton, &self.entries[0].clip, normalized_time, out),
            _ => {
                let Some((lo, hi, factor)) = self.bracket(value, settings.degenerate_epsilon)
                else {
                    return Ok(());
                };

                sample_entry(skeleton, &self.entries[lo].clip, normalized_time, out);
                if factor > 0.0 {
                    let Some(upper) = scratch.alloc_joints(out.len(), JointTransform::IDENTITY)
                    else {
                        return Err(exhausted(skeleton, out));
                    };
                    sample_entry(skeleton, &self.entries[hi].clip, normalized_time, upper);
                    blend(out, upper, factor);
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// 2D
// ============================================================================

#[derive(Debug, Clone)]
pub struct BlendSpace2D {
    pub parameter_x: usize,
    pub parameter_y: usize,
    entries: SmallVec<[BlendEntry2D; MAX_BLEND_ENTRIES]>,
}

impl BlendSpace2D {
    #[must_use]
    pub fn new(parameter_x: usize, parameter_y: usize) -> Self {
        Self {
            parameter_x,
            parameter_y,
            entries: SmallVec::new(),
        }
    }

    pub fn add_entry(&mut self, position: Vec2, clip: Arc<AnimationClip>) -> Result<()> {
        if self.entries.len() >= MAX_BLEND_ENTRIES {
            return Err(AnimationError::CapacityExceeded {
                table: "2D blend space entries",
                capacity: MAX_BLEND_ENTRIES,
            });
        }
        self.entries.push(BlendEntry2D { position, clip });
        Ok(())
    }

    pub fn with_entry(mut self, position: Vec2, clip: Arc<AnimationClip>) -> Result<Self> {
        self.add_entry(position, clip)?;
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[BlendEntry2D] {
        &self.entries
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        self.entries.iter().map(|e| e.clip.duration).fold(0.0, f32::max)
    }

    /// The three entries nearest to `point` by squared distance, closest first.
    ///
    /// Ties keep scan order: a later entry only displaces an earlier one when
    /// it is strictly closer.
    #[must_use]
    pub fn nearest_three(&self, point: Vec2) -> Option<[usize; 3]> {
        if self.entries.len() < 3 {
            return None;
        }

        let mut best = [(usize::MAX, f32::INFINITY); 3];
        for (i, entry) in self.entries.iter().enumerate() {
            let d = entry.position.distance_squared(point);
            if d < best[2].1 {
                best[2] = (i, d);
                let mut k = 2;
                while k > 0 && best[k].1 < best[k - 1].1 {
                    best.swap(k, k - 1);
                    k -= 1;
                }
            }
        }

        // NaN distances never enter the selection; fall back to the first three.
        if best.iter().any(|(i, _)| *i == usize::MAX) {
            return Some([0, 1, 2]);
        }
        Some([best[0].0, best[1].0, best[2].0])
    }

    /// Entry indices and weights of the triangle used for `point`.
    ///
    /// Weights are barycentric, or inverse-distance when the triangle is
    /// degenerate; negative weights are clamped and the rest renormalized.
    #[must_use]
    pub fn triangle_weights(&self, point: Vec2, epsilon: f32) -> Option<[(usize, f32); 3]> {
        let [i0, i1, i2] = self.nearest_three(point)?;
        let a = self.entries[i0].position;
        let b = self.entries[i1].position;
        let c = self.entries[i2].position;

        let raw = barycentric(point, a, b, c, epsilon)
            .unwrap_or_else(|| inverse_distance(point, [a, b, c], epsilon));

        let clamped = raw.max(Vec3::ZERO);
        let sum = clamped.x + clamped.y + clamped.z;
        let w = if sum > epsilon { clamped / sum } else { Vec3::X };

        Some([(i0, w.x), (i1, w.y), (i2, w.z)])
    }

    pub fn evaluate<S: ScratchAllocator + ?Sized>(
        &self,
        skeleton: &Skeleton,
        point: Vec2,
        normalized_time: f32,
        scratch: &S,
        settings: &EvaluationSettings,
        out: &mut [JointTransform],
    ) -> Result<()> {
        let eps = settings.degenerate_epsilon;
        match self.entries.len() {
            0 => write_rest_pose(skeleton, out),
            1 => sample_entry(skeleton, &self.entries[0].clip, normalized_time, out),
            2 => {
                let a = &self.entries[0];
                let b = &self.entries[1];
                let ab = b.position - a.position;
                let len2 = ab.length_squared();
                let t = if len2 > eps {
                    ((point - a.position).dot(ab) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };

                sample_entry(skeleton, &a.clip, normalized_time, out);
                if t > 0.0 {
                    let Some(other) = scratch.alloc_joints(out.len(), JointTransform::IDENTITY)
                    else {
                        return Err(exhausted(skeleton, out));
                    };
                    sample_entry(skeleton, &b.clip, normalized_time, other);
                    blend(out, other, t);
                }
            }
            _ => {
                let Some([(i0, w0), (i1, w1), (i2, w2)]) = self.triangle_weights(point, eps)
                else {
                    return Ok(());
                };

                sample_entry(skeleton, &self.entries[i0].clip, normalized_time, out);
                if w1 <= eps && w2 <= eps {
                    return Ok(());
                }

                let Some(temp) = scratch.alloc_joints(out.len(), JointTransform::IDENTITY) else {
                    return Err(exhausted(skeleton, out));
                };

                let pair = w0 + w1;
                if w1 > eps && pair > eps {
                    sample_entry(skeleton, &self.entries[i1].clip, normalized_time, temp);
                    blend(out, temp, w1 / pair);
                }
                if w2 > eps {
                    sample_entry(skeleton, &self.entries[i2].clip, normalized_time, temp);
                    blend(out, temp, w2);
                }
            }
        }
        Ok(())
    }
}

/// Barycentric coordinates of `p` in triangle `(a, b, c)`, or `None` when the
/// triangle has (near) zero area.
fn barycentric(p: Vec2, a: Vec2, b: Vec2, c: Vec2, epsilon: f32) -> Option<Vec3> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() <= epsilon {
        return None;
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some(Vec3::new(1.0 - v - w, v, w))
}

fn inverse_distance(p: Vec2, corners: [Vec2; 3], epsilon: f32) -> Vec3 {
    let d = Vec3::new(
        p.distance(corners[0]),
        p.distance(corners[1]),
        p.distance(corners[2]),
    );
    if d.x <= epsilon {
        return Vec3::X;
    }
    if d.y <= epsilon {
        return Vec3::Y;
    }
    if d.z <= epsilon {
        return Vec3::Z;
    }
    Vec3::ONE / d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barycentric_at_vertex() {
        let w = barycentric(Vec2::ZERO, Vec2::ZERO, Vec2::X, Vec2::Y, 1e-6).unwrap();
        assert_eq!(w, Vec3::X);
    }

    #[test]
    fn test_barycentric_degenerate() {
        let collinear = barycentric(Vec2::ZERO, Vec2::ZERO, Vec2::X, Vec2::X * 2.0, 1e-6);
        assert!(collinear.is_none());
    }

    #[test]
    fn test_inverse_distance_coincident_point() {
        let w = inverse_distance(Vec2::X, [Vec2::ZERO, Vec2::X, Vec2::Y], 1e-6);
        assert_eq!(w, Vec3::Y);
    }
}
