//! Error types for the twinsync bridge, organized by subsystem:
//! variable store, model, per-cycle stepping, and startup.

use std::error::Error;
use std::fmt;

use crate::value::VariableKind;

/// Errors from the variable store.
///
/// All store errors are caller-visible and non-fatal: the operation is
/// rejected, the store is unchanged, and the process continues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// No variable with this name is registered.
    UnknownVariable {
        /// The requested name.
        name: String,
    },
    /// The variable is read-only for the external interface.
    NotWritable {
        /// The targeted variable.
        name: String,
    },
    /// The value's kind does not match the variable's declared kind.
    TypeMismatch {
        /// The targeted variable.
        name: String,
        /// Declared kind.
        expected: VariableKind,
        /// Kind of the rejected value.
        actual: VariableKind,
    },
    /// An output batch named a writable (input) variable.
    NotAnOutput {
        /// The offending entry.
        name: String,
    },
    /// Two definitions share a name.
    DuplicateVariable {
        /// The duplicated name.
        name: String,
    },
    /// The store mutex could not be acquired within the bounded wait.
    LockTimeout {
        /// How long the caller waited, in milliseconds.
        waited_ms: u64,
    },
    /// The session is not authorized to write.
    Unauthorized,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownVariable { name } => write!(f, "unknown variable '{name}'"),
            Self::NotWritable { name } => write!(f, "variable '{name}' is not writable"),
            Self::TypeMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for '{name}': expected {expected}, got {actual}"
            ),
            Self::NotAnOutput { name } => {
                write!(f, "variable '{name}' is an input and cannot be published")
            }
            Self::DuplicateVariable { name } => write!(f, "duplicate variable '{name}'"),
            Self::LockTimeout { waited_ms } => {
                write!(f, "store lock not acquired within {waited_ms}ms")
            }
            Self::Unauthorized => write!(f, "session is not authorized to write"),
        }
    }
}

impl Error for StoreError {}

/// Errors reported by a [`SimulationModel`](crate::SimulationModel) or
/// [`ModelProvider`](crate::ModelProvider).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModelError {
    /// The model has no slot with this name.
    UnknownSlot {
        /// The requested slot.
        name: String,
    },
    /// The model refused a value (wrong kind, out of range, non-finite).
    InvalidValue {
        /// The targeted slot.
        name: String,
        /// Why the value was refused.
        reason: String,
    },
    /// The numerical solver failed to converge or became unstable.
    SolverFailed {
        /// Description of the failure.
        reason: String,
    },
    /// The model reference could not be resolved or instantiated.
    InstantiationFailed {
        /// Description of the failure.
        reason: String,
    },
    /// Any other model-reported failure.
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSlot { name } => write!(f, "unknown model slot '{name}'"),
            Self::InvalidValue { name, reason } => {
                write!(f, "invalid value for '{name}': {reason}")
            }
            Self::SolverFailed { reason } => write!(f, "solver failed: {reason}"),
            Self::InstantiationFailed { reason } => write!(f, "instantiation failed: {reason}"),
            Self::Failed { reason } => write!(f, "model failed: {reason}"),
        }
    }
}

impl Error for ModelError {}

/// Errors from one synchronization cycle of the stepping engine.
///
/// A step error is fatal for its cycle only: the previous outputs are
/// retained and the synchronization clock still advances.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// The model refused an input value.
    InputRejected {
        /// The rejected input.
        name: String,
        /// The model's reason.
        source: ModelError,
    },
    /// Discrete evaluation or continuous integration failed, or the
    /// sub-step loop misbehaved.
    IntegrationFailure {
        /// Simulation time reached before the failure.
        reached: f64,
        /// The synchronization point being targeted.
        target: f64,
        /// Description of the failure.
        reason: String,
    },
    /// An output could not be read back after the step.
    OutputUnavailable {
        /// The output slot.
        name: String,
        /// The model's reason.
        source: ModelError,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputRejected { name, source } => {
                write!(f, "input '{name}' rejected: {source}")
            }
            Self::IntegrationFailure {
                reached,
                target,
                reason,
            } => write!(
                f,
                "integration failed at t={reached} (target {target}): {reason}"
            ),
            Self::OutputUnavailable { name, source } => {
                write!(f, "output '{name}' unavailable: {source}")
            }
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InputRejected { source, .. } | Self::OutputUnavailable { source, .. } => {
                Some(source)
            }
            Self::IntegrationFailure { .. } => None,
        }
    }
}

/// Startup failures. The process must not begin serving after one.
#[derive(Clone, Debug, PartialEq)]
pub enum InitError {
    /// The provider could not instantiate the model.
    Instantiation(ModelError),
    /// An initial input value was refused by the model.
    InitialValueRejected {
        /// The rejected input.
        name: String,
        /// The model's reason.
        source: ModelError,
    },
    /// Model initialization failed.
    Initialization(ModelError),
    /// The initial outputs could not be read or published.
    InitialOutputs {
        /// Description of the failure.
        reason: String,
    },
    /// The store could not serve the initial exchange.
    Store(StoreError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instantiation(e) => write!(f, "model instantiation: {e}"),
            Self::InitialValueRejected { name, source } => {
                write!(f, "initial value for '{name}' rejected: {source}")
            }
            Self::Initialization(e) => write!(f, "model initialization: {e}"),
            Self::InitialOutputs { reason } => write!(f, "initial outputs: {reason}"),
            Self::Store(e) => write!(f, "store: {e}"),
        }
    }
}

impl Error for InitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Instantiation(e) | Self::Initialization(e) => Some(e),
            Self::InitialValueRejected { source, .. } => Some(source),
            Self::Store(e) => Some(e),
            Self::InitialOutputs { .. } => None,
        }
    }
}

impl From<StoreError> for InitError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_message_names_both_kinds() {
        let e = StoreError::TypeMismatch {
            name: "T_return_secondary_set".into(),
            expected: VariableKind::Real,
            actual: VariableKind::Boolean,
        };
        assert_eq!(
            e.to_string(),
            "type mismatch for 'T_return_secondary_set': expected real, got boolean"
        );
    }

    #[test]
    fn step_error_chains_model_error() {
        let e = StepError::InputRejected {
            name: "m_flow_return_secondary".into(),
            source: ModelError::InvalidValue {
                name: "m_flow_return_secondary".into(),
                reason: "negative".into(),
            },
        };
        let src = e.source().expect("source");
        assert!(src.to_string().contains("negative"));
    }

    #[test]
    fn init_error_from_store_error() {
        let e: InitError = StoreError::LockTimeout { waited_ms: 5 }.into();
        assert!(matches!(e, InitError::Store(StoreError::LockTimeout { .. })));
        assert!(e.source().is_some());
    }
}
