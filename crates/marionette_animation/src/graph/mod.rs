//! Layered animation graphs: a shared [`GraphDefinition`] plus one
//! [`GraphInstance`] per animated entity.

pub mod condition;
pub mod definition;
pub mod instance;
pub mod parameters;

pub use condition::{Comparison, Condition, MAX_CONDITIONS, TransitionPredicate};
pub use definition::{
    AnimationEvent, BlendMode, GraphDefinition, LayerDef, MAX_EVENTS_PER_STATE, MAX_LAYERS,
    MAX_STATES_PER_LAYER, MAX_TRANSITIONS_PER_LAYER, StateDef, StateKind, TransitionDef,
};
pub use instance::{EventCallback, GraphInstance, LayerRuntime};
pub use parameters::{MAX_PARAMETERS, ParameterDef, ParameterKind, ParameterValue, Parameters};
