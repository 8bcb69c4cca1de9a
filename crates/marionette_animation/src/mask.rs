//! Bone Masks
//!
//! Per-joint weights in `[0, 1]` restricting a layer's influence to part of
//! the skeleton. Masks are built once (usually at load time) and shared by the
//! layers that reference them.

use marionette_core::Skeleton;

#[derive(Debug, Clone, PartialEq)]
pub struct BoneMask {
    weights: Vec<f32>,
}

impl BoneMask {
    /// Every joint gets `weight`.
    #[must_use]
    pub fn uniform(skeleton: &Skeleton, weight: f32) -> Self {
        Self {
            weights: vec![weight.clamp(0.0, 1.0); skeleton.joint_count()],
        }
    }

    /// `weight` on `root` and every joint below it, 0 elsewhere.
    #[must_use]
    pub fn from_joint(skeleton: &Skeleton, root: usize, weight: f32) -> Self {
        let mut mask = Self::uniform(skeleton, 0.0);
        if root >= skeleton.joint_count() {
            log::warn!(
                "BoneMask::from_joint: joint {root} out of range for skeleton '{}'",
                skeleton.name
            );
            return mask;
        }
        mask.fill_subtree(skeleton, root, weight.clamp(0.0, 1.0));
        mask
    }

    /// 1 everywhere except `root` and its descendants, which get 0.
    #[must_use]
    pub fn excluding_joint(skeleton: &Skeleton, root: usize) -> Self {
        let mut mask = Self::uniform(skeleton, 1.0);
        if root >= skeleton.joint_count() {
            log::warn!(
                "BoneMask::excluding_joint: joint {root} out of range for skeleton '{}'",
                skeleton.name
            );
            return mask;
        }
        mask.fill_subtree(skeleton, root, 0.0);
        mask
    }

    fn fill_subtree(&mut self, skeleton: &Skeleton, root: usize, weight: f32) {
        // Parents precede children, so nothing above `root` can be below it.
        for (joint, w) in self.weights.iter_mut().enumerate().skip(root) {
            if skeleton.is_descendant_of(joint, root) {
                *w = weight;
            }
        }
    }

    /// Weight of `joint`; joints outside the mask weigh 0.
    #[inline]
    #[must_use]
    pub fn weight(&self, joint: usize) -> f32 {
        self.weights.get(joint).copied().unwrap_or(0.0)
    }

    pub fn set_weight(&mut self, joint: usize, weight: f32) {
        match self.weights.get_mut(joint) {
            Some(w) => *w = weight.clamp(0.0, 1.0),
            None => log::warn!("BoneMask::set_weight: joint {joint} out of range"),
        }
    }

    /// Multiplies `other` into this mask, joint by joint.
    pub fn combine_with(&mut self, other: &BoneMask) {
        for (i, w) in self.weights.iter_mut().enumerate() {
            *w *= other.weight(i);
        }
    }

    #[inline]
    #[must_use]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}
