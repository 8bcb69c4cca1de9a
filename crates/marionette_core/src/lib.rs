//! Core types for the Marionette animation engine.
//!
//! Everything here is asset-side, immutable-after-load data or a tiny shared
//! utility; the animation crate builds the evaluation pipeline on top.

pub mod errors;
pub mod scratch;
pub mod settings;
pub mod skeleton;
pub mod transform;

pub use errors::{AnimationError, Result};
pub use scratch::{ScratchAllocator, pose_bytes};
pub use settings::EvaluationSettings;
pub use skeleton::{MAX_JOINTS, NO_PARENT, Skeleton};
pub use transform::{JointTransform, align_hemisphere, slerp_shortest};
