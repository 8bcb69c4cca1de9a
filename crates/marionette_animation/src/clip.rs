use glam::{Quat, Vec3};
use marionette_core::{AnimationError, Result};

use crate::tracks::KeyframeTrack;

#[derive(Debug, Clone)]
pub enum ChannelData {
    Translation(KeyframeTrack<Vec3>),
    Rotation(KeyframeTrack<Quat>),
    Scale(KeyframeTrack<Vec3>),
}

impl ChannelData {
    #[must_use]
    pub fn end_time(&self) -> f32 {
        match self {
            Self::Translation(track) | Self::Scale(track) => track.end_time(),
            Self::Rotation(track) => track.end_time(),
        }
    }
}

/// One joint's one animated property over time.
#[derive(Debug, Clone)]
pub struct Channel {
    pub joint: usize,
    pub data: ChannelData,
}

impl Channel {
    #[must_use]
    pub fn translation(joint: usize, track: KeyframeTrack<Vec3>) -> Self {
        Self {
            joint,
            data: ChannelData::Translation(track),
        }
    }

    #[must_use]
    pub fn rotation(joint: usize, track: KeyframeTrack<Quat>) -> Self {
        Self {
            joint,
            data: ChannelData::Rotation(track),
        }
    }

    #[must_use]
    pub fn scale(joint: usize, track: KeyframeTrack<Vec3>) -> Self {
        Self {
            joint,
            data: ChannelData::Scale(track),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    /// Creates a clip; the duration is the largest timestamp across channels.
    #[must_use]
    pub fn new(name: &str, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .map(|c| c.data.end_time())
            .fold(0.0_f32, f32::max);

        Self {
            name: name.to_string(),
            duration,
            channels,
        }
    }

    /// Checks every channel's keyframes and that each targets a joint below
    /// `joint_count`.
    pub fn validate(&self, joint_count: usize) -> Result<()> {
        for (i, channel) in self.channels.iter().enumerate() {
            if channel.joint >= joint_count {
                return Err(AnimationError::InvalidChannel(format!(
                    "clip '{}' channel {i} targets joint {} but the skeleton has {joint_count}",
                    self.name, channel.joint
                )));
            }

            let checked = match &channel.data {
                ChannelData::Translation(track) | ChannelData::Scale(track) => track.validate(),
                ChannelData::Rotation(track) => track.validate(),
            };
            checked.map_err(|e| match e {
                AnimationError::InvalidChannel(msg) => AnimationError::InvalidChannel(format!(
                    "clip '{}' channel {i}: {msg}",
                    self.name
                )),
                other => other,
            })?;
        }
        Ok(())
    }
}
