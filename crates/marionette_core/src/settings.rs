//! Evaluation Settings
//!
//! Numeric tolerances shared by the blenders, blend spaces and the graph
//! instance.
//!
//! ```rust,ignore
//! let settings = EvaluationSettings {
//!     mask_weight_epsilon: 1e-3,
//!     ..Default::default()
//! };
//! let instance = GraphInstance::with_settings(definition, skeleton, settings);
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSettings {
    /// Effective per-joint weights at or below this value copy the base joint
    /// unchanged in masked and additive blends.
    pub mask_weight_epsilon: f32,
    /// Guard for divisions by keyframe gaps, clip durations, blend-space
    /// bracket widths and triangle areas.
    pub degenerate_epsilon: f32,
}

impl Default for EvaluationSettings {
    #[inline]
    fn default() -> Self {
        Self {
            mask_weight_epsilon: 1e-4,
            degenerate_epsilon: 1e-6,
        }
    }
}
