//! Skeletal animation evaluation and blending.
//!
//! Data flows leaf-first through the modules:
//!
//! ```text
//! tracks/values ─► clip ─► pose ─► blend_space ─┐
//!                                 blend ◄───────┤
//!                                 mask  ◄───────┤
//!                  graph (definition + instance)┘ ─► skinning ─► joint matrices
//! ```

pub mod blend;
pub mod blend_space;
pub mod clip;
pub mod graph;
pub mod mask;
pub mod pose;
pub mod skinning;
pub mod tracks;
pub mod values;

pub use blend::{blend, blend_additive, blend_masked};
pub use blend_space::{BlendEntry1D, BlendEntry2D, BlendSpace1D, BlendSpace2D, MAX_BLEND_ENTRIES};
pub use clip::{AnimationClip, Channel, ChannelData};
pub use graph::{
    AnimationEvent, BlendMode, Comparison, Condition, GraphDefinition, GraphInstance, LayerRuntime,
    ParameterKind, ParameterValue, Parameters,
};
pub use mask::BoneMask;
pub use pose::{evaluate_clip, write_rest_pose};
pub use skinning::{compute_global_transforms, compute_joint_matrices};
pub use tracks::{InterpolationMode, KeyframeTrack};
pub use values::Interpolatable;
