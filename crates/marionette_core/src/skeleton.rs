//! Skeleton
//!
//! Static joint hierarchy shared by every animated instance of a model:
//! parent indices, rest pose, inverse bind matrices and the root transform.
//!
//! Joints are stored parent-before-child, so a single forward pass over the
//! joint array is enough to propagate world transforms down the hierarchy.

use glam::Affine3A;

use crate::errors::{AnimationError, Result};
use crate::transform::JointTransform;

/// Maximum number of joints a skeleton may hold.
pub const MAX_JOINTS: usize = 128;

/// Parent index value marking a root joint.
pub const NO_PARENT: i16 = -1;

#[derive(Debug, Clone)]
pub struct Skeleton {
    pub name: String,

    pub bone_names: Vec<String>,
    // parent_indices[i] < i, or NO_PARENT
    pub(crate) parent_indices: Vec<i16>,

    // Transforms vertices from mesh space into each joint's local space.
    pub(crate) inverse_bind_matrices: Vec<Affine3A>,

    pub(crate) rest_pose: Vec<JointTransform>,

    /// Applied on top of every root joint's local transform.
    pub root_transform: Affine3A,
}

impl Skeleton {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bone_names: Vec::new(),
            parent_indices: Vec::new(),
            inverse_bind_matrices: Vec::new(),
            rest_pose: Vec::new(),
            root_transform: Affine3A::IDENTITY,
        }
    }

    #[must_use]
    pub fn with_root_transform(mut self, root_transform: Affine3A) -> Self {
        self.root_transform = root_transform;
        self
    }

    /// Appends a joint and returns its index.
    ///
    /// The parent must already exist: hierarchies are built top-down.
    pub fn add_joint(
        &mut self,
        name: &str,
        parent: Option<usize>,
        rest: JointTransform,
        inverse_bind_matrix: Affine3A,
    ) -> Result<usize> {
        let index = self.joint_count();
        if index >= MAX_JOINTS {
            return Err(AnimationError::CapacityExceeded {
                table: "skeleton joints",
                capacity: MAX_JOINTS,
            });
        }

        let parent_index = match parent {
            Some(p) if p >= index => {
                return Err(AnimationError::InvalidSkeleton(format!(
                    "joint '{name}' references parent {p}, which is not declared before it"
                )));
            }
            Some(p) => p as i16,
            None => NO_PARENT,
        };

        self.bone_names.push(name.to_string());
        self.parent_indices.push(parent_index);
        self.inverse_bind_matrices.push(inverse_bind_matrix);
        self.rest_pose.push(rest);
        Ok(index)
    }

    #[inline]
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.parent_indices.len()
    }

    /// Parent of `joint`, or `None` for roots and out-of-range indices.
    #[inline]
    #[must_use]
    pub fn parent(&self, joint: usize) -> Option<usize> {
        match self.parent_indices.get(joint) {
            Some(&p) if p >= 0 => Some(p as usize),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn rest_pose(&self) -> &[JointTransform] {
        &self.rest_pose
    }

    #[inline]
    #[must_use]
    pub fn inverse_bind_matrices(&self) -> &[Affine3A] {
        &self.inverse_bind_matrices
    }

    #[must_use]
    pub fn find_joint(&self, name: &str) -> Option<usize> {
        self.bone_names.iter().position(|n| n == name)
    }

    /// Returns true if `joint` is `ancestor` or lies below it.
    #[must_use]
    pub fn is_descendant_of(&self, joint: usize, ancestor: usize) -> bool {
        let mut current = Some(joint);
        while let Some(j) = current {
            if j == ancestor {
                return true;
            }
            current = self.parent(j);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(len: usize) -> Skeleton {
        let mut skeleton = Skeleton::new("chain");
        for i in 0..len {
            let parent = i.checked_sub(1);
            skeleton
                .add_joint(&format!("j{i}"), parent, JointTransform::IDENTITY, Affine3A::IDENTITY)
                .unwrap();
        }
        skeleton
    }

    #[test]
    fn test_parent_must_precede_child() {
        let mut skeleton = Skeleton::new("bad");
        let err = skeleton
            .add_joint("root", Some(0), JointTransform::IDENTITY, Affine3A::IDENTITY)
            .unwrap_err();
        assert!(matches!(err, AnimationError::InvalidSkeleton(_)));
    }

    #[test]
    fn test_capacity() {
        let mut skeleton = chain(MAX_JOINTS);
        let err = skeleton
            .add_joint("extra", Some(0), JointTransform::IDENTITY, Affine3A::IDENTITY)
            .unwrap_err();
        assert_eq!(
            err,
            AnimationError::CapacityExceeded {
                table: "skeleton joints",
                capacity: MAX_JOINTS
            }
        );
    }

    #[test]
    fn test_descendants() {
        let skeleton = chain(4);
        assert!(skeleton.is_descendant_of(3, 1));
        assert!(!skeleton.is_descendant_of(1, 3));
        assert_eq!(skeleton.parent(0), None);
        assert_eq!(skeleton.parent(99), None);
        assert_eq!(skeleton.find_joint("j2"), Some(2));
    }
}
