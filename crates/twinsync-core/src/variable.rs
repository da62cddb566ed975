//! Variable definitions registered with the store.

use crate::value::{Value, VariableKind};

/// Definition of a variable exposed through the store.
///
/// Variables are registered once at startup. Writable variables are model
/// inputs set by the external interface; read-only variables are model
/// outputs published by the synchronization driver after each cycle.
///
/// # Examples
///
/// ```
/// use twinsync_core::{Value, VariableDef, VariableKind};
///
/// let input = VariableDef::input("T_supply_primary_set", Value::Real(353.15));
/// assert!(input.writable);
/// assert_eq!(input.kind, VariableKind::Real);
///
/// let output = VariableDef::output("T_supply_secondary", VariableKind::Real);
/// assert!(!output.writable);
/// assert_eq!(output.initial, Value::Real(0.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDef {
    /// Unique name; also the model slot name.
    pub name: String,
    /// Declared value kind. Writes of another kind are rejected.
    pub kind: VariableKind,
    /// Value held before the first write or publish.
    pub initial: Value,
    /// Whether the external interface may write this variable.
    pub writable: bool,
    /// Optional unit annotation (e.g. `"K"`, `"kg/s"`).
    pub units: Option<String>,
}

impl VariableDef {
    /// A writable model input with an initial value. The kind is taken
    /// from the value.
    pub fn input(name: impl Into<String>, initial: Value) -> Self {
        Self {
            name: name.into(),
            kind: initial.kind(),
            initial,
            writable: true,
            units: None,
        }
    }

    /// A read-only model output, initialized to the kind's zero value.
    pub fn output(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            initial: Value::zero(kind),
            writable: false,
            units: None,
        }
    }

    /// Attach a unit annotation.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}
