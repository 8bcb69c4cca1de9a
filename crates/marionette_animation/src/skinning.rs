//! Pose-to-Matrix Pass
//!
//! Converts a composited local pose into world-space joint transforms and then
//! into skinning matrices (`global * inverse_bind`) ready for GPU upload.
//!
//! Relies on the skeleton's parent-before-child joint order: one forward pass
//! sees every parent's global transform before its children need it.

use glam::{Affine3A, Mat4};
use marionette_core::{JointTransform, Skeleton};

/// Propagates `local` down the hierarchy into `globals`.
///
/// Root joints are premultiplied by the skeleton's root transform.
pub fn compute_global_transforms(
    skeleton: &Skeleton,
    local: &[JointTransform],
    globals: &mut [Affine3A],
) {
    let count = skeleton.joint_count().min(local.len()).min(globals.len());

    for i in 0..count {
        let local_matrix = local[i].to_affine();
        globals[i] = match skeleton.parent(i) {
            Some(parent) => globals[parent] * local_matrix,
            None => skeleton.root_transform * local_matrix,
        };
    }
}

/// Computes world transforms into `globals` and final skinning matrices into
/// `joint_matrices`.
pub fn compute_joint_matrices(
    skeleton: &Skeleton,
    local: &[JointTransform],
    globals: &mut [Affine3A],
    joint_matrices: &mut [Mat4],
) {
    compute_global_transforms(skeleton, local, globals);

    for ((out, global), ibm) in joint_matrices
        .iter_mut()
        .zip(globals.iter())
        .zip(skeleton.inverse_bind_matrices())
    {
        *out = Mat4::from(*global * *ibm);
    }
}
