//! # Marionette
//!
//! Layered skeletal animation: keyframe sampling, pose blending, 1D/2D blend
//! spaces, bone masks, per-layer state machines and skinning matrices.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use marionette::prelude::*;
//!
//! let definition = Arc::new(build_definition()?);
//! let mut instance = GraphInstance::new(definition, skeleton);
//! let mut arena = bumpalo::Bump::with_capacity(instance.scratch_bytes_per_update());
//!
//! loop {
//!     arena.reset();
//!     instance.set_float_by_name("speed", speed);
//!     instance.update(dt, &arena);
//!     upload(instance.joint_matrix_bytes());
//! }
//! ```

pub use glam;
pub use marionette_animation as animation;
pub use marionette_core;

pub use marionette_animation::{
    AnimationClip, AnimationEvent, BlendMode, BlendSpace1D, BlendSpace2D, BoneMask, Channel,
    Comparison, Condition, GraphDefinition, GraphInstance, InterpolationMode, KeyframeTrack,
};
pub use marionette_core::{
    AnimationError, EvaluationSettings, JointTransform, Result, ScratchAllocator, Skeleton,
};

pub mod prelude {
    pub use marionette_animation::{
        AnimationClip, AnimationEvent, BlendMode, BlendSpace1D, BlendSpace2D, BoneMask, Channel,
        Comparison, Condition, GraphDefinition, GraphInstance, InterpolationMode, KeyframeTrack,
    };
    pub use marionette_core::{
        AnimationError, EvaluationSettings, JointTransform, ScratchAllocator, Skeleton,
    };
}
