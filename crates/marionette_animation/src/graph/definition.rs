//! Graph Definition
//!
//! The shared, immutable half of an animation graph: parameters, layers,
//! states, transitions and events. A definition is assembled once through the
//! `add_*` calls below, then wrapped in an `Arc` and handed to any number of
//! [`GraphInstance`](crate::graph::GraphInstance)s.
//!
//! Every table has a fixed capacity. Adding past it returns
//! [`AnimationError::CapacityExceeded`]; nothing grows after construction.
//!
//! ```rust,ignore
//! let mut def = GraphDefinition::new();
//! let speed = def.add_float_parameter("speed", 0.0)?;
//! let base = def.add_layer("base", BlendMode::Override, 1.0, None)?;
//! let idle = def.add_clip_state(base, "idle", idle_clip, 1.0, true)?;
//! let run = def.add_clip_state(base, "run", run_clip, 1.0, true)?;
//! let t = def.add_transition(base, idle, run, 0.25)?;
//! def.add_condition(base, t, Condition::float(speed, Comparison::Greater, 0.5))?;
//! let def = Arc::new(def);
//! ```

use std::sync::Arc;

use marionette_core::{AnimationError, MAX_JOINTS, Result, Skeleton};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::blend_space::{BlendSpace1D, BlendSpace2D};
use crate::clip::AnimationClip;
use crate::graph::condition::{Condition, MAX_CONDITIONS};
use crate::graph::parameters::{MAX_PARAMETERS, ParameterDef, ParameterKind, ParameterValue};
use crate::mask::BoneMask;

pub const MAX_LAYERS: usize = 4;
pub const MAX_STATES_PER_LAYER: usize = 16;
pub const MAX_TRANSITIONS_PER_LAYER: usize = 32;
pub const MAX_EVENTS_PER_STATE: usize = 16;

/// How a layer merges into the layers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Override,
    /// Adds the layer's difference from the skeleton rest pose.
    Additive,
}

#[derive(Debug, Clone)]
pub enum StateKind {
    Clip(Arc<AnimationClip>),
    Blend1D(BlendSpace1D),
    Blend2D(BlendSpace2D),
}

/// A named marker on a state's timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationEvent {
    pub time: f32,
    pub id: u32,
    pub name: String,
}

impl AnimationEvent {
    #[must_use]
    pub fn new(time: f32, id: u32, name: &str) -> Self {
        Self {
            time,
            id,
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateDef {
    pub name: String,
    pub kind: StateKind,
    pub speed: f32,
    pub looping: bool,
    /// Sorted by time.
    pub events: Vec<AnimationEvent>,
}

impl StateDef {
    /// Clip duration, or the longest entry of a blend space.
    #[must_use]
    pub fn duration(&self) -> f32 {
        match &self.kind {
            StateKind::Clip(clip) => clip.duration,
            StateKind::Blend1D(space) => space.duration(),
            StateKind::Blend2D(space) => space.duration(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionDef {
    pub source: usize,
    pub target: usize,
    pub duration: f32,
    /// AND-combined. A transition without conditions never fires.
    pub conditions: SmallVec<[Condition; MAX_CONDITIONS]>,
    /// Normalized source time (0..=1) that must be reached before firing.
    pub exit_time: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct LayerDef {
    pub name: String,
    pub blend_mode: BlendMode,
    pub weight: f32,
    pub mask: Option<Arc<BoneMask>>,
    pub states: Vec<StateDef>,
    pub transitions: Vec<TransitionDef>,
    pub default_state: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GraphDefinition {
    parameters: Vec<ParameterDef>,
    parameter_lookup: FxHashMap<String, usize>,
    layers: Vec<LayerDef>,
}

impl GraphDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parameters: Vec::with_capacity(MAX_PARAMETERS),
            parameter_lookup: FxHashMap::default(),
            layers: Vec::with_capacity(MAX_LAYERS),
        }
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    pub fn add_float_parameter(&mut self, name: &str, default: f32) -> Result<usize> {
        self.push_parameter(name, ParameterValue::Float(default), false)
    }

    pub fn add_bool_parameter(&mut self, name: &str, default: bool) -> Result<usize> {
        self.push_parameter(name, ParameterValue::Bool(default), false)
    }

    /// A bool that starts `false` and is cleared by the transition it fires.
    pub fn add_trigger(&mut self, name: &str) -> Result<usize> {
        self.push_parameter(name, ParameterValue::Bool(false), true)
    }

    fn push_parameter(
        &mut self,
        name: &str,
        default: ParameterValue,
        trigger: bool,
    ) -> Result<usize> {
        if self.parameters.len() >= MAX_PARAMETERS {
            return Err(AnimationError::CapacityExceeded {
                table: "parameters",
                capacity: MAX_PARAMETERS,
            });
        }
        if self.parameter_lookup.contains_key(name) {
            return Err(AnimationError::DuplicateName(name.to_string()));
        }

        let index = self.parameters.len();
        self.parameters.push(ParameterDef {
            name: name.to_string(),
            default,
            trigger,
        });
        self.parameter_lookup.insert(name.to_string(), index);
        Ok(index)
    }

    // ========================================================================
    // Layers & States
    // ========================================================================

    pub fn add_layer(
        &mut self,
        name: &str,
        blend_mode: BlendMode,
        weight: f32,
        mask: Option<Arc<BoneMask>>,
    ) -> Result<usize> {
        if self.layers.len() >= MAX_LAYERS {
            return Err(AnimationError::CapacityExceeded {
                table: "layers",
                capacity: MAX_LAYERS,
            });
        }

        let index = self.layers.len();
        self.layers.push(LayerDef {
            name: name.to_string(),
            blend_mode,
            weight: weight.clamp(0.0, 1.0),
            mask,
            states: Vec::new(),
            transitions: Vec::new(),
            default_state: 0,
        });
        Ok(index)
    }

    pub fn add_clip_state(
        &mut self,
        layer: usize,
        name: &str,
        clip: Arc<AnimationClip>,
        speed: f32,
        looping: bool,
    ) -> Result<usize> {
        clip.validate(MAX_JOINTS)?;
        self.push_state(layer, name, StateKind::Clip(clip), speed, looping)
    }

    pub fn add_blend1d_state(
        &mut self,
        layer: usize,
        name: &str,
        space: BlendSpace1D,
        speed: f32,
        looping: bool,
    ) -> Result<usize> {
        self.check_parameter(space.parameter, "1D blend space parameter")?;
        for entry in space.entries() {
            entry.clip.validate(MAX_JOINTS)?;
        }
        self.push_state(layer, name, StateKind::Blend1D(space), speed, looping)
    }

    pub fn add_blend2d_state(
        &mut self,
        layer: usize,
        name: &str,
        space: BlendSpace2D,
        speed: f32,
        looping: bool,
    ) -> Result<usize> {
        self.check_parameter(space.parameter_x, "2D blend space x parameter")?;
        self.check_parameter(space.parameter_y, "2D blend space y parameter")?;
        for entry in space.entries() {
            entry.clip.validate(MAX_JOINTS)?;
        }
        self.push_state(layer, name, StateKind::Blend2D(space), speed, looping)
    }

    fn push_state(
        &mut self,
        layer: usize,
        name: &str,
        kind: StateKind,
        speed: f32,
        looping: bool,
    ) -> Result<usize> {
        let layer_def = self.layer_mut(layer)?;
        if layer_def.states.len() >= MAX_STATES_PER_LAYER {
            return Err(AnimationError::CapacityExceeded {
                table: "layer states",
                capacity: MAX_STATES_PER_LAYER,
            });
        }

        let index = layer_def.states.len();
        layer_def.states.push(StateDef {
            name: name.to_string(),
            kind,
            speed,
            looping,
            events: Vec::new(),
        });
        Ok(index)
    }

    pub fn set_default_state(&mut self, layer: usize, state: usize) -> Result<()> {
        let layer_def = self.layer_mut(layer)?;
        if state >= layer_def.states.len() {
            return Err(AnimationError::InvalidIndex {
                context: "default state",
                index: state,
            });
        }
        layer_def.default_state = state;
        Ok(())
    }

    /// Replaces a state's events; they are stored sorted by time.
    pub fn set_events(
        &mut self,
        layer: usize,
        state: usize,
        mut events: Vec<AnimationEvent>,
    ) -> Result<()> {
        if events.len() > MAX_EVENTS_PER_STATE {
            return Err(AnimationError::CapacityExceeded {
                table: "state events",
                capacity: MAX_EVENTS_PER_STATE,
            });
        }
        let state_def = self.state_mut(layer, state)?;
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        state_def.events = events;
        Ok(())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    pub fn add_transition(
        &mut self,
        layer: usize,
        source: usize,
        target: usize,
        duration: f32,
    ) -> Result<usize> {
        let layer_def = self.layer_mut(layer)?;
        let state_count = layer_def.states.len();
        if source >= state_count {
            return Err(AnimationError::InvalidIndex {
                context: "transition source state",
                index: source,
            });
        }
        if target >= state_count {
            return Err(AnimationError::InvalidIndex {
                context: "transition target state",
                index: target,
            });
        }
        if layer_def.transitions.len() >= MAX_TRANSITIONS_PER_LAYER {
            return Err(AnimationError::CapacityExceeded {
                table: "layer transitions",
                capacity: MAX_TRANSITIONS_PER_LAYER,
            });
        }

        let index = layer_def.transitions.len();
        layer_def.transitions.push(TransitionDef {
            source,
            target,
            duration: duration.max(0.0),
            conditions: SmallVec::new(),
            exit_time: None,
        });
        Ok(index)
    }

    pub fn add_condition(
        &mut self,
        layer: usize,
        transition: usize,
        condition: Condition,
    ) -> Result<()> {
        if let Some(parameter) = condition.parameter() {
            self.check_parameter(parameter, "condition parameter")?;
        }

        let transition_def = self.transition_mut(layer, transition)?;
        if transition_def.conditions.len() >= MAX_CONDITIONS {
            return Err(AnimationError::CapacityExceeded {
                table: "transition conditions",
                capacity: MAX_CONDITIONS,
            });
        }
        transition_def.conditions.push(condition);
        Ok(())
    }

    /// Gates the transition until the source state's normalized time reaches
    /// `normalized_time` (clamped to 0..=1).
    pub fn set_exit_time(
        &mut self,
        layer: usize,
        transition: usize,
        normalized_time: f32,
    ) -> Result<()> {
        let transition_def = self.transition_mut(layer, transition)?;
        transition_def.exit_time = Some(normalized_time.clamp(0.0, 1.0));
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[ParameterDef] {
        &self.parameters
    }

    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[LayerDef] {
        &self.layers
    }

    #[inline]
    #[must_use]
    pub fn layer(&self, index: usize) -> Option<&LayerDef> {
        self.layers.get(index)
    }

    #[must_use]
    pub fn find_parameter(&self, name: &str) -> Option<usize> {
        self.parameter_lookup.get(name).copied()
    }

    #[must_use]
    pub fn find_layer(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }

    #[must_use]
    pub fn find_state(&self, layer: usize, name: &str) -> Option<usize> {
        self.layers.get(layer)?.states.iter().position(|s| s.name == name)
    }

    #[must_use]
    pub fn parameter_kind(&self, index: usize) -> Option<ParameterKind> {
        self.parameters.get(index).map(ParameterDef::kind)
    }

    /// Checks every clip and mask against `skeleton`.
    pub fn validate_for(&self, skeleton: &Skeleton) -> Result<()> {
        let joint_count = skeleton.joint_count();
        for layer in &self.layers {
            if let Some(mask) = &layer.mask
                && mask.len() != joint_count
            {
                return Err(AnimationError::InvalidSkeleton(format!(
                    "layer '{}' mask covers {} joints, skeleton '{}' has {joint_count}",
                    layer.name,
                    mask.len(),
                    skeleton.name
                )));
            }
            for state in &layer.states {
                match &state.kind {
                    StateKind::Clip(clip) => clip.validate(joint_count)?,
                    StateKind::Blend1D(space) => {
                        for entry in space.entries() {
                            entry.clip.validate(joint_count)?;
                        }
                    }
                    StateKind::Blend2D(space) => {
                        for entry in space.entries() {
                            entry.clip.validate(joint_count)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Internal accessors
    // ========================================================================

    fn check_parameter(&self, index: usize, context: &'static str) -> Result<()> {
        if index < self.parameters.len() {
            Ok(())
        } else {
            Err(AnimationError::InvalidIndex { context, index })
        }
    }

    fn layer_mut(&mut self, layer: usize) -> Result<&mut LayerDef> {
        self.layers.get_mut(layer).ok_or(AnimationError::InvalidIndex {
            context: "layer",
            index: layer,
        })
    }

    fn state_mut(&mut self, layer: usize, state: usize) -> Result<&mut StateDef> {
        self.layer_mut(layer)?
            .states
            .get_mut(state)
            .ok_or(AnimationError::InvalidIndex {
                context: "state",
                index: state,
            })
    }

    fn transition_mut(&mut self, layer: usize, transition: usize) -> Result<&mut TransitionDef> {
        self.layer_mut(layer)?
            .transitions
            .get_mut(transition)
            .ok_or(AnimationError::InvalidIndex {
                context: "transition",
                index: transition,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::Channel;
    use crate::graph::condition::Comparison;
    use crate::tracks::{InterpolationMode, KeyframeTrack};
    use glam::Vec3;

    fn clip() -> Arc<AnimationClip> {
        Arc::new(AnimationClip::new(
            "c",
            vec![Channel::translation(
                0,
                KeyframeTrack::new(
                    vec![0.0, 1.0],
                    vec![Vec3::ZERO, Vec3::X],
                    InterpolationMode::Linear,
                ),
            )],
        ))
    }

    #[test]
    fn test_parameter_capacity_and_lookup() {
        let mut def = GraphDefinition::new();
        for i in 0..MAX_PARAMETERS {
            assert_eq!(def.add_float_parameter(&format!("p{i}"), 0.0), Ok(i));
        }
        assert!(matches!(
            def.add_bool_parameter("overflow", false),
            Err(AnimationError::CapacityExceeded { .. })
        ));
        assert_eq!(def.find_parameter("p3"), Some(3));
        assert_eq!(def.find_parameter("missing"), None);
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let mut def = GraphDefinition::new();
        def.add_float_parameter("speed", 0.0).unwrap();
        assert_eq!(
            def.add_float_parameter("speed", 1.0),
            Err(AnimationError::DuplicateName("speed".into()))
        );
    }

    #[test]
    fn test_condition_capacity() {
        let mut def = GraphDefinition::new();
        let p = def.add_float_parameter("speed", 0.0).unwrap();
        let layer = def.add_layer("base", BlendMode::Override, 1.0, None).unwrap();
        let a = def.add_clip_state(layer, "a", clip(), 1.0, true).unwrap();
        let b = def.add_clip_state(layer, "b", clip(), 1.0, true).unwrap();
        let t = def.add_transition(layer, a, b, 0.2).unwrap();
        for _ in 0..MAX_CONDITIONS {
            def.add_condition(layer, t, Condition::float(p, Comparison::Greater, 0.0))
                .unwrap();
        }
        assert!(matches!(
            def.add_condition(layer, t, Condition::float(p, Comparison::Greater, 0.0)),
            Err(AnimationError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_invalid_state_references() {
        let mut def = GraphDefinition::new();
        let layer = def.add_layer("base", BlendMode::Override, 1.0, None).unwrap();
        def.add_clip_state(layer, "a", clip(), 1.0, true).unwrap();
        assert!(matches!(
            def.add_transition(layer, 0, 5, 0.1),
            Err(AnimationError::InvalidIndex { .. })
        ));
        assert!(def.set_default_state(layer, 1).is_err());
        assert!(def.add_clip_state(7, "x", clip(), 1.0, true).is_err());
    }

    #[test]
    fn test_events_sorted() {
        let mut def = GraphDefinition::new();
        let layer = def.add_layer("base", BlendMode::Override, 1.0, None).unwrap();
        let s = def.add_clip_state(layer, "a", clip(), 1.0, true).unwrap();
        def.set_events(
            layer,
            s,
            vec![AnimationEvent::new(0.8, 2, "late"), AnimationEvent::new(0.1, 1, "early")],
        )
        .unwrap();
        let events = &def.layer(layer).unwrap().states[s].events;
        assert_eq!(events[0].name, "early");
        assert_eq!(events[1].name, "late");
    }
}
