//! Typed variable values and their kinds.

use std::fmt;

/// Declared data type of a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// A double-precision floating-point quantity.
    Real,
    /// A boolean flag.
    Boolean,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::Boolean => write!(f, "boolean"),
        }
    }
}

/// A single variable value crossing the store/model boundary.
///
/// # Examples
///
/// ```
/// use twinsync_core::{Value, VariableKind};
///
/// let t = Value::Real(323.15);
/// assert_eq!(t.kind(), VariableKind::Real);
/// assert_eq!(t.as_real(), Some(323.15));
/// assert_eq!(Value::Boolean(true).as_real(), None);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    /// A real-valued quantity.
    Real(f64),
    /// A boolean flag.
    Boolean(bool),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> VariableKind {
        match self {
            Self::Real(_) => VariableKind::Real,
            Self::Boolean(_) => VariableKind::Boolean,
        }
    }

    /// The contained real, or `None` for a boolean.
    pub fn as_real(&self) -> Option<f64> {
        match *self {
            Self::Real(v) => Some(v),
            Self::Boolean(_) => None,
        }
    }

    /// The contained boolean, or `None` for a real.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Boolean(b) => Some(b),
            Self::Real(_) => None,
        }
    }

    /// The zero value of a kind: `0.0` or `false`.
    pub fn zero(kind: VariableKind) -> Self {
        match kind {
            VariableKind::Real => Self::Real(0.0),
            VariableKind::Boolean => Self::Boolean(false),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Real(v) => write!(f, "{v}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}
