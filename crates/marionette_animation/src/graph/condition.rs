use std::fmt;
use std::sync::Arc;

use crate::graph::parameters::Parameters;

/// Maximum number of conditions on one transition.
pub const MAX_CONDITIONS: usize = 4;

/// Host-supplied transition test, evaluated against the instance parameters.
pub type TransitionPredicate = Arc<dyn Fn(&Parameters) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Equal,
    NotEqual,
}

impl Comparison {
    #[inline]
    #[must_use]
    pub fn compare(self, value: f32, threshold: f32) -> bool {
        match self {
            Self::Greater => value > threshold,
            Self::GreaterOrEqual => value >= threshold,
            Self::Less => value < threshold,
            Self::LessOrEqual => value <= threshold,
            Self::Equal => (value - threshold).abs() <= f32::EPSILON,
            Self::NotEqual => (value - threshold).abs() > f32::EPSILON,
        }
    }
}

#[derive(Clone)]
pub enum Condition {
    Float {
        parameter: usize,
        comparison: Comparison,
        threshold: f32,
    },
    Bool {
        parameter: usize,
        value: bool,
    },
    Predicate(TransitionPredicate),
}

impl Condition {
    #[must_use]
    pub fn float(parameter: usize, comparison: Comparison, threshold: f32) -> Self {
        Self::Float {
            parameter,
            comparison,
            threshold,
        }
    }

    #[must_use]
    pub fn bool(parameter: usize, value: bool) -> Self {
        Self::Bool { parameter, value }
    }

    #[must_use]
    pub fn predicate(f: impl Fn(&Parameters) -> bool + Send + Sync + 'static) -> Self {
        Self::Predicate(Arc::new(f))
    }

    /// Parameter read by this condition, if any.
    #[inline]
    #[must_use]
    pub fn parameter(&self) -> Option<usize> {
        match self {
            Self::Float { parameter, .. } | Self::Bool { parameter, .. } => Some(*parameter),
            Self::Predicate(_) => None,
        }
    }

    /// Unknown parameters evaluate to `false`.
    #[must_use]
    pub fn evaluate(&self, parameters: &Parameters) -> bool {
        match self {
            Self::Float {
                parameter,
                comparison,
                threshold,
            } => parameters
                .get(*parameter)
                .is_some_and(|v| comparison.compare(v.as_float(), *threshold)),
            Self::Bool { parameter, value } => parameters
                .get(*parameter)
                .is_some_and(|v| v.as_bool() == *value),
            Self::Predicate(f) => f(parameters),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float {
                parameter,
                comparison,
                threshold,
            } => f
                .debug_struct("Float")
                .field("parameter", parameter)
                .field("comparison", comparison)
                .field("threshold", threshold)
                .finish(),
            Self::Bool { parameter, value } => f
                .debug_struct("Bool")
                .field("parameter", parameter)
                .field("value", value)
                .finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
