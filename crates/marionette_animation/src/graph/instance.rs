//! Graph Instance
//!
//! The per-entity, mutable half of an animation graph. An instance holds its
//! parameter values, one [`LayerRuntime`] per layer and the output skinning
//! matrices, and is advanced once per frame with [`GraphInstance::update`].
//!
//! # Per-layer update
//!
//! ```text
//!  transition check ─► time advance ─► state pose ─► crossfade ─► events
//!  (not while        (speed, loop      (clip / 1D /  (previous     (old, new]
//!   transitioning)    or clamp)         2D)           state pose)   split on wrap)
//! ```
//!
//! Layers are then folded in ascending order into a composite pose (override
//! or additive, optionally masked), which the skinning pass turns into joint
//! matrices.
//!
//! # Scratch memory
//!
//! Every temporary pose comes from the caller's arena. When the arena runs dry
//! the affected layer (or the whole frame) falls back to the rest pose; the
//! state machine itself still advances.

use std::sync::Arc;

use glam::{Affine3A, Mat4, Vec2};
use marionette_core::{
    EvaluationSettings, JointTransform, Result, ScratchAllocator, Skeleton, pose_bytes,
};
use smallvec::SmallVec;

use crate::blend::{blend, blend_additive, blend_masked};
use crate::graph::definition::{
    BlendMode, GraphDefinition, LayerDef, MAX_LAYERS, StateDef, StateKind, TransitionDef,
};
use crate::graph::parameters::{ParameterValue, Parameters};
use crate::pose::{evaluate_clip, write_rest_pose};
use crate::skinning::compute_joint_matrices;

/// Invoked synchronously during `update` with `(event id, event name)`.
pub type EventCallback = Box<dyn FnMut(u32, &str) + Send>;

/// Mutable per-layer state-machine data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerRuntime {
    pub current_state: usize,
    /// Local time of the current state, in seconds.
    pub state_time: f32,
    pub normalized_time: f32,
    pub transitioning: bool,
    pub previous_state: usize,
    pub previous_time: f32,
    pub transition_elapsed: f32,
    pub transition_duration: f32,
    /// Runtime weight, initialised from the layer definition.
    pub weight: f32,
}

impl LayerRuntime {
    fn new(layer: &LayerDef) -> Self {
        Self {
            current_state: layer.default_state,
            state_time: 0.0,
            normalized_time: 0.0,
            transitioning: false,
            previous_state: layer.default_state,
            previous_time: 0.0,
            transition_elapsed: 0.0,
            transition_duration: 0.0,
            weight: layer.weight,
        }
    }

    /// Crossfade progress in `[0, 1]`, or `None` when not transitioning.
    #[must_use]
    pub fn transition_progress(&self) -> Option<f32> {
        self.transitioning
            .then(|| crossfade_factor(self.transition_elapsed, self.transition_duration))
    }
}

/// What the state-machine step decided for one layer this frame.
struct LayerStep {
    old_time: f32,
    advanced: f32,
    /// Crossfade factor while a transition is still running after this frame.
    crossfade: Option<f32>,
}

pub struct GraphInstance {
    definition: Arc<GraphDefinition>,
    skeleton: Arc<Skeleton>,
    settings: EvaluationSettings,

    parameters: Parameters,
    layers: SmallVec<[LayerRuntime; MAX_LAYERS]>,

    // Output buffers, sized once at creation.
    local_pose: Vec<JointTransform>,
    global_transforms: Vec<Affine3A>,
    joint_matrices: Vec<Mat4>,

    event_callback: Option<EventCallback>,
}

impl std::fmt::Debug for GraphInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphInstance")
            .field("skeleton", &self.skeleton.name)
            .field("parameters", &self.parameters)
            .field("layers", &self.layers)
            .field("has_event_callback", &self.event_callback.is_some())
            .finish_non_exhaustive()
    }
}

impl GraphInstance {
    #[must_use]
    pub fn new(definition: Arc<GraphDefinition>, skeleton: Arc<Skeleton>) -> Self {
        Self::with_settings(definition, skeleton, EvaluationSettings::default())
    }

    #[must_use]
    pub fn with_settings(
        definition: Arc<GraphDefinition>,
        skeleton: Arc<Skeleton>,
        settings: EvaluationSettings,
    ) -> Self {
        let joint_count = skeleton.joint_count();
        let parameters = Parameters::from_defaults(definition.parameters());
        let layers = definition.layers().iter().map(LayerRuntime::new).collect();

        let mut instance = Self {
            local_pose: skeleton.rest_pose().to_vec(),
            global_transforms: vec![Affine3A::IDENTITY; joint_count],
            joint_matrices: vec![Mat4::IDENTITY; joint_count],
            definition,
            skeleton,
            settings,
            parameters,
            layers,
            event_callback: None,
        };
        compute_joint_matrices(
            &instance.skeleton,
            &instance.local_pose,
            &mut instance.global_transforms,
            &mut instance.joint_matrices,
        );
        instance
    }

    /// Like [`new`](Self::new), but first checks the definition's clips and
    /// masks against the skeleton.
    pub fn try_new(definition: Arc<GraphDefinition>, skeleton: Arc<Skeleton>) -> Result<Self> {
        definition.validate_for(&skeleton)?;
        Ok(Self::new(definition, skeleton))
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Advances every layer by `dt` seconds and recomputes the joint matrices.
    ///
    /// Temporary poses are taken from `scratch`, which the caller resets once
    /// per frame.
    pub fn update<S: ScratchAllocator + ?Sized>(&mut self, dt: f32, scratch: &S) {
        let definition = Arc::clone(&self.definition);
        let skeleton = Arc::clone(&self.skeleton);
        let joint_count = skeleton.joint_count();

        let mut composite = scratch.alloc_joints(joint_count, JointTransform::IDENTITY);
        match composite.as_deref_mut() {
            Some(pose) => write_rest_pose(&skeleton, pose),
            None => log::warn!(
                "GraphInstance: scratch exhausted for the composite pose, using rest pose"
            ),
        }

        for (index, layer) in definition.layers().iter().enumerate() {
            let step = self.step_layer(index, layer, dt);

            if let Some(composite) = composite.as_deref_mut() {
                match self.evaluate_layer(index, layer, step.crossfade, &skeleton, scratch) {
                    Some(pose) => self.compose_layer(index, layer, composite, pose, &skeleton),
                    None => log::warn!(
                        "GraphInstance: scratch exhausted evaluating layer '{}', layer skipped",
                        layer.name
                    ),
                }
            }

            self.fire_events(index, layer, &step);
        }

        match composite {
            Some(pose) => self.local_pose.copy_from_slice(pose),
            None => self.local_pose.copy_from_slice(skeleton.rest_pose()),
        }

        compute_joint_matrices(
            &skeleton,
            &self.local_pose,
            &mut self.global_transforms,
            &mut self.joint_matrices,
        );
    }

    /// Transition check, time advance and crossfade bookkeeping for one layer.
    fn step_layer(&mut self, index: usize, layer: &LayerDef, dt: f32) -> LayerStep {
        let eps = self.settings.degenerate_epsilon;
        let mut rt = self.layers[index];

        let Some(mut state) = layer.states.get(rt.current_state) else {
            return LayerStep {
                old_time: rt.state_time,
                advanced: 0.0,
                crossfade: None,
            };
        };

        // 1. Transition check
        if !rt.transitioning {
            let normalized = normalized_time(state, rt.state_time, eps);
            let fired = layer.transitions.iter().find(|t| {
                t.source == rt.current_state && self.can_fire(t, normalized)
            });

            if let Some(transition) = fired {
                log::debug!(
                    "layer '{}': '{}' -> '{}' over {}s",
                    layer.name,
                    state.name,
                    layer.states[transition.target].name,
                    transition.duration
                );
                self.consume_triggers(transition);

                rt.previous_state = rt.current_state;
                rt.previous_time = rt.state_time;
                rt.current_state = transition.target;
                rt.state_time = 0.0;
                rt.transitioning = true;
                rt.transition_elapsed = 0.0;
                rt.transition_duration = transition.duration;
                state = &layer.states[transition.target];
            }
        }

        // 2. Time advance
        let old_time = rt.state_time;
        rt.state_time = advance_time(state, rt.state_time, dt, eps);
        rt.normalized_time = normalized_time(state, rt.state_time, eps);

        // 4. Crossfade bookkeeping (the poses are blended in `evaluate_layer`)
        let mut crossfade = None;
        if rt.transitioning {
            if let Some(previous) = layer.states.get(rt.previous_state) {
                rt.previous_time = advance_time(previous, rt.previous_time, dt, eps);
            }
            rt.transition_elapsed += dt.max(0.0);

            let factor = crossfade_factor(rt.transition_elapsed, rt.transition_duration);
            if factor >= 1.0 {
                rt.transitioning = false;
                log::debug!("layer '{}': transition into '{}' complete", layer.name, state.name);
            } else {
                crossfade = Some(factor);
            }
        }

        self.layers[index] = rt;
        LayerStep {
            old_time,
            advanced: dt * state.speed,
            crossfade,
        }
    }

    fn can_fire(&self, transition: &TransitionDef, normalized: f32) -> bool {
        if transition.exit_time.is_some_and(|gate| normalized < gate) {
            return false;
        }
        // A transition without conditions never fires.
        !transition.conditions.is_empty()
            && transition.conditions.iter().all(|c| c.evaluate(&self.parameters))
    }

    fn consume_triggers(&mut self, transition: &TransitionDef) {
        for condition in &transition.conditions {
            let Some(parameter) = condition.parameter() else {
                continue;
            };
            if self
                .definition
                .parameters()
                .get(parameter)
                .is_some_and(|def| def.trigger)
            {
                self.parameters.set(parameter, ParameterValue::Bool(false));
            }
        }
    }

    /// Current state pose, crossfaded from the previous state when needed.
    fn evaluate_layer<'s, S: ScratchAllocator + ?Sized>(
        &self,
        index: usize,
        layer: &LayerDef,
        crossfade: Option<f32>,
        skeleton: &Skeleton,
        scratch: &'s S,
    ) -> Option<&'s mut [JointTransform]> {
        let rt = &self.layers[index];
        let pose = scratch.alloc_joints(skeleton.joint_count(), JointTransform::IDENTITY)?;

        let Some(state) = layer.states.get(rt.current_state) else {
            write_rest_pose(skeleton, pose);
            return Some(pose);
        };
        self.evaluate_state(state, rt.state_time, skeleton, scratch, pose);

        let Some(factor) = crossfade else {
            return Some(pose);
        };
        let Some(previous_state) = layer.states.get(rt.previous_state) else {
            return Some(pose);
        };

        let Some(previous) = scratch.alloc_joints(skeleton.joint_count(), JointTransform::IDENTITY)
        else {
            log::warn!(
                "GraphInstance: scratch exhausted during crossfade on layer '{}', using rest pose",
                layer.name
            );
            write_rest_pose(skeleton, pose);
            return Some(pose);
        };
        self.evaluate_state(previous_state, rt.previous_time, skeleton, scratch, previous);
        blend(previous, pose, factor);
        Some(previous)
    }

    /// Dispatches on the state kind.
    fn evaluate_state<S: ScratchAllocator + ?Sized>(
        &self,
        state: &StateDef,
        time: f32,
        skeleton: &Skeleton,
        scratch: &S,
        out: &mut [JointTransform],
    ) {
        let normalized = normalized_time(state, time, self.settings.degenerate_epsilon);
        let result = match &state.kind {
            StateKind::Clip(clip) => {
                evaluate_clip(skeleton, clip, time, out);
                Ok(())
            }
            StateKind::Blend1D(space) => {
                let value = self.parameters.float_or_zero(space.parameter);
                space.evaluate(skeleton, value, normalized, scratch, &self.settings, out)
            }
            StateKind::Blend2D(space) => {
                let point = Vec2::new(
                    self.parameters.float_or_zero(space.parameter_x),
                    self.parameters.float_or_zero(space.parameter_y),
                );
                space.evaluate(skeleton, point, normalized, scratch, &self.settings, out)
            }
        };

        if let Err(err) = result {
            log::warn!("GraphInstance: state '{}' degraded to rest pose: {err}", state.name);
        }
    }

    /// Folds one layer's pose into the running composite.
    fn compose_layer(
        &self,
        index: usize,
        layer: &LayerDef,
        composite: &mut [JointTransform],
        pose: &[JointTransform],
        skeleton: &Skeleton,
    ) {
        if index == 0 {
            composite.copy_from_slice(pose);
            return;
        }

        let weight = self.layers[index].weight;
        let eps = self.settings.mask_weight_epsilon;
        match (layer.blend_mode, layer.mask.as_deref()) {
            (BlendMode::Override, Some(mask)) => blend_masked(composite, pose, mask, weight, eps),
            (BlendMode::Override, None) => blend(composite, pose, weight),
            (BlendMode::Additive, mask) => {
                blend_additive(composite, pose, skeleton.rest_pose(), mask, weight, eps);
            }
        }
    }

    /// Fires events of the current state crossed during this frame's advance.
    fn fire_events(&mut self, index: usize, layer: &LayerDef, step: &LayerStep) {
        if step.advanced <= 0.0 {
            return;
        }
        let Some(callback) = self.event_callback.as_mut() else {
            return;
        };
        let rt = &self.layers[index];
        let Some(state) = layer.states.get(rt.current_state) else {
            return;
        };
        if state.events.is_empty() {
            return;
        }

        let duration = state.duration();
        if duration <= self.settings.degenerate_epsilon {
            return;
        }

        let old_time = step.old_time;
        let new_time = rt.state_time;

        let mut fire = |lo_exclusive: Option<f32>, hi: f32| {
            for event in &state.events {
                let after_lo = lo_exclusive.is_none_or(|lo| event.time > lo);
                if after_lo && event.time <= hi {
                    log::trace!("layer '{}': event '{}' ({})", layer.name, event.name, event.id);
                    callback(event.id, &event.name);
                }
            }
        };

        if state.looping && step.advanced >= duration {
            // A full cycle or more: every event once, in playback order.
            fire(Some(old_time), duration);
            fire(None, old_time);
        } else if state.looping && new_time < old_time {
            fire(Some(old_time), duration);
            fire(None, new_time);
        } else {
            fire(Some(old_time), new_time);
        }
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    pub fn set_float(&mut self, index: usize, value: f32) {
        if !self.parameters.set(index, ParameterValue::Float(value)) {
            log::warn!("GraphInstance::set_float: no float parameter at index {index}");
        }
    }

    pub fn set_bool(&mut self, index: usize, value: bool) {
        if !self.parameters.set(index, ParameterValue::Bool(value)) {
            log::warn!("GraphInstance::set_bool: no bool parameter at index {index}");
        }
    }

    /// Sets a trigger (or any bool parameter) to `true`.
    pub fn set_trigger(&mut self, index: usize) {
        self.set_bool(index, true);
    }

    pub fn set_float_by_name(&mut self, name: &str, value: f32) {
        match self.definition.find_parameter(name) {
            Some(index) => self.set_float(index, value),
            None => log::warn!("GraphInstance::set_float_by_name: unknown parameter '{name}'"),
        }
    }

    pub fn set_bool_by_name(&mut self, name: &str, value: bool) {
        match self.definition.find_parameter(name) {
            Some(index) => self.set_bool(index, value),
            None => log::warn!("GraphInstance::set_bool_by_name: unknown parameter '{name}'"),
        }
    }

    pub fn set_trigger_by_name(&mut self, name: &str) {
        self.set_bool_by_name(name, true);
    }

    #[must_use]
    pub fn float(&self, index: usize) -> Option<f32> {
        self.parameters.float(index)
    }

    #[must_use]
    pub fn bool(&self, index: usize) -> Option<bool> {
        self.parameters.bool(index)
    }

    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Restores every parameter to its definition default.
    pub fn reset_parameters(&mut self) {
        self.parameters = Parameters::from_defaults(self.definition.parameters());
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn set_event_callback(&mut self, callback: impl FnMut(u32, &str) + Send + 'static) {
        self.event_callback = Some(Box::new(callback));
    }

    pub fn clear_event_callback(&mut self) {
        self.event_callback = None;
    }

    // ========================================================================
    // Layer control
    // ========================================================================

    /// Sets a layer's runtime weight, clamped to `[0, 1]`.
    ///
    /// The base layer always contributes the full pose, so layer 0 keeps its
    /// weight and the call is ignored with a warning.
    pub fn set_layer_weight(&mut self, layer: usize, weight: f32) {
        if layer == 0 && !self.layers.is_empty() {
            log::warn!("GraphInstance::set_layer_weight: the base layer ignores its weight");
            return;
        }
        match self.layers.get_mut(layer) {
            Some(rt) => rt.weight = weight.clamp(0.0, 1.0),
            None => log::warn!("GraphInstance::set_layer_weight: invalid layer {layer}"),
        }
    }

    /// Jumps straight to `state`, cancelling any running transition.
    pub fn set_state(&mut self, layer: usize, state: usize) {
        if !self.check_state(layer, state, "set_state") {
            return;
        }
        let rt = &mut self.layers[layer];
        rt.current_state = state;
        rt.state_time = 0.0;
        rt.normalized_time = 0.0;
        rt.transitioning = false;
        rt.transition_elapsed = 0.0;
        rt.transition_duration = 0.0;
    }

    /// Starts a crossfade to `state`, bypassing transition conditions.
    pub fn transition_to(&mut self, layer: usize, state: usize, duration: f32) {
        if !self.check_state(layer, state, "transition_to") {
            return;
        }
        let rt = &mut self.layers[layer];
        rt.previous_state = rt.current_state;
        rt.previous_time = rt.state_time;
        rt.current_state = state;
        rt.state_time = 0.0;
        rt.normalized_time = 0.0;
        rt.transitioning = true;
        rt.transition_elapsed = 0.0;
        rt.transition_duration = duration.max(0.0);
    }

    /// Scrubs the current state to `time`, clamped to its duration.
    pub fn set_state_time(&mut self, layer: usize, time: f32) {
        let Some(state) = self.current_state_def(layer) else {
            log::warn!("GraphInstance::set_state_time: invalid layer {layer}");
            return;
        };
        let duration = state.duration();
        let eps = self.settings.degenerate_epsilon;
        let time = time.clamp(0.0, duration.max(0.0));
        let normalized = normalized_time(state, time, eps);

        let rt = &mut self.layers[layer];
        rt.state_time = time;
        rt.normalized_time = normalized;
    }

    fn check_state(&self, layer: usize, state: usize, context: &str) -> bool {
        let Some(layer_def) = self.definition.layer(layer) else {
            log::warn!("GraphInstance::{context}: invalid layer {layer}");
            return false;
        };
        if state >= layer_def.states.len() {
            log::warn!(
                "GraphInstance::{context}: invalid state {state} on layer '{}'",
                layer_def.name
            );
            return false;
        }
        true
    }

    fn current_state_def(&self, layer: usize) -> Option<&StateDef> {
        let rt = self.layers.get(layer)?;
        self.definition.layer(layer)?.states.get(rt.current_state)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    #[must_use]
    pub fn layer_runtime(&self, layer: usize) -> Option<&LayerRuntime> {
        self.layers.get(layer)
    }

    #[must_use]
    pub fn current_state(&self, layer: usize) -> Option<usize> {
        self.layers.get(layer).map(|rt| rt.current_state)
    }

    #[must_use]
    pub fn is_transitioning(&self, layer: usize) -> bool {
        self.layers.get(layer).is_some_and(|rt| rt.transitioning)
    }

    #[must_use]
    pub fn state_time(&self, layer: usize) -> Option<f32> {
        self.layers.get(layer).map(|rt| rt.state_time)
    }

    #[must_use]
    pub fn normalized_time(&self, layer: usize) -> Option<f32> {
        self.layers.get(layer).map(|rt| rt.normalized_time)
    }

    #[must_use]
    pub fn transition_progress(&self, layer: usize) -> Option<f32> {
        self.layers.get(layer)?.transition_progress()
    }

    #[must_use]
    pub fn layer_weight(&self, layer: usize) -> Option<f32> {
        self.layers.get(layer).map(|rt| rt.weight)
    }

    /// Final skinning matrices, one per joint.
    #[inline]
    #[must_use]
    pub fn joint_matrices(&self) -> &[Mat4] {
        &self.joint_matrices
    }

    /// Skinning matrices as raw bytes for a GPU buffer upload.
    #[inline]
    #[must_use]
    pub fn joint_matrix_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.joint_matrices)
    }

    /// World-space joint transforms from the last update.
    #[inline]
    #[must_use]
    pub fn global_transforms(&self) -> &[Affine3A] {
        &self.global_transforms
    }

    /// Composited local pose from the last update.
    #[inline]
    #[must_use]
    pub fn local_pose(&self) -> &[JointTransform] {
        &self.local_pose
    }

    #[inline]
    #[must_use]
    pub fn definition(&self) -> &Arc<GraphDefinition> {
        &self.definition
    }

    #[inline]
    #[must_use]
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    /// Upper bound of scratch bytes one `update` may request.
    #[must_use]
    pub fn scratch_bytes_per_update(&self) -> usize {
        // Composite, plus per layer: current and previous state poses, each
        // with one blend-space temporary.
        pose_bytes(self.skeleton.joint_count(), 1 + 4 * self.layers.len())
    }
}

/// Advances a state's local time, wrapping looping states and clamping the
/// rest to `[0, duration]`.
fn advance_time(state: &StateDef, time: f32, dt: f32, epsilon: f32) -> f32 {
    let duration = state.duration();
    if duration <= epsilon {
        return 0.0;
    }

    let t = time + dt * state.speed;
    if state.looping {
        let mut wrapped = t % duration;
        if wrapped < 0.0 {
            wrapped += duration;
        }
        if wrapped >= duration { 0.0 } else { wrapped }
    } else {
        t.clamp(0.0, duration)
    }
}

fn normalized_time(state: &StateDef, time: f32, epsilon: f32) -> f32 {
    let duration = state.duration();
    if duration <= epsilon {
        0.0
    } else {
        (time / duration).clamp(0.0, 1.0)
    }
}

fn crossfade_factor(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        1.0
    } else {
        (elapsed / duration).min(1.0)
    }
}
