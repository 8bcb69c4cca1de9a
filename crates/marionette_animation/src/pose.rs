//! Pose Evaluation
//!
//! A pose is a plain `[JointTransform]` slice with one entry per skeleton
//! joint, normally carved out of the per-frame scratch arena.

use marionette_core::{JointTransform, Skeleton};

use crate::clip::{AnimationClip, ChannelData};

/// Overwrites `out` with the skeleton's rest pose.
#[inline]
pub fn write_rest_pose(skeleton: &Skeleton, out: &mut [JointTransform]) {
    let rest = skeleton.rest_pose();
    let n = rest.len().min(out.len());
    out[..n].copy_from_slice(&rest[..n]);
}

/// Samples `clip` at `time` into `out`.
///
/// Every joint starts at its rest transform; only the properties targeted by
/// the clip's channels are overwritten.
pub fn evaluate_clip(
    skeleton: &Skeleton,
    clip: &AnimationClip,
    time: f32,
    out: &mut [JointTransform],
) {
    write_rest_pose(skeleton, out);

    for channel in &clip.channels {
        let Some(joint) = out.get_mut(channel.joint) else {
            continue;
        };

        match &channel.data {
            ChannelData::Translation(track) => {
                if let Some(v) = track.sample(time) {
                    joint.translation = v;
                }
            }
            ChannelData::Rotation(track) => {
                if let Some(q) = track.sample(time) {
                    joint.rotation = q;
                }
            }
            ChannelData::Scale(track) => {
                if let Some(v) = track.sample(time) {
                    joint.scale = v;
                }
            }
        }
    }
}
