use smallvec::SmallVec;

/// Maximum number of parameters in one graph definition.
pub const MAX_PARAMETERS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Float,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue {
    Float(f32),
    Bool(bool),
}

impl ParameterValue {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ParameterKind {
        match self {
            Self::Float(_) => ParameterKind::Float,
            Self::Bool(_) => ParameterKind::Bool,
        }
    }

    /// Bools read as 0.0 / 1.0.
    #[inline]
    #[must_use]
    pub fn as_float(&self) -> f32 {
        match *self {
            Self::Float(v) => v,
            Self::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Floats read as `true` when non-zero.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match *self {
            Self::Float(v) => v != 0.0,
            Self::Bool(b) => b,
        }
    }
}

/// Shared, immutable description of one parameter.
#[derive(Debug, Clone)]
pub struct ParameterDef {
    pub name: String,
    pub default: ParameterValue,
    /// Triggers are bools that reset to `false` once a transition whose
    /// conditions read them fires.
    pub trigger: bool,
}

impl ParameterDef {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ParameterKind {
        self.default.kind()
    }
}

/// Per-instance parameter values, indexed like the definition's parameters.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: SmallVec<[ParameterValue; MAX_PARAMETERS]>,
}

impl Parameters {
    #[must_use]
    pub fn from_defaults(defs: &[ParameterDef]) -> Self {
        Self {
            values: defs.iter().map(|d| d.default).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<ParameterValue> {
        self.values.get(index).copied()
    }

    #[inline]
    #[must_use]
    pub fn float(&self, index: usize) -> Option<f32> {
        match self.get(index)? {
            ParameterValue::Float(v) => Some(v),
            ParameterValue::Bool(_) => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn bool(&self, index: usize) -> Option<bool> {
        match self.get(index)? {
            ParameterValue::Bool(b) => Some(b),
            ParameterValue::Float(_) => None,
        }
    }

    /// Value as a float, or 0 when the index is unknown.
    #[inline]
    #[must_use]
    pub fn float_or_zero(&self, index: usize) -> f32 {
        self.get(index).map_or(0.0, |v| v.as_float())
    }

    /// Writes `value` if the slot exists and has the same kind.
    pub(crate) fn set(&mut self, index: usize, value: ParameterValue) -> bool {
        match self.values.get_mut(index) {
            Some(slot) if slot.kind() == value.kind() => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
