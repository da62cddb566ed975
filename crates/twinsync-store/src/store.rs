//! [`VariableStore`]: typed, named values behind a bounded-wait mutex.
//!
//! # Concurrency
//!
//! Every operation takes the store mutex for a short critical section
//! and never holds it across a model call. Lock acquisition waits at most
//! the configured timeout and then fails with
//! [`StoreError::LockTimeout`], so no caller blocks indefinitely.
//!
//! Individual operations are atomic. [`write_outputs`](VariableStore::write_outputs)
//! validates its whole batch before touching any value, so a reader sees
//! either the complete previous output set or the complete new one.

use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};

use twinsync_core::{ExchangeSnapshot, StoreError, Value, VariableDef, VariableKind};

/// Default bounded wait on the store mutex.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(100);

struct Slot {
    kind: VariableKind,
    writable: bool,
    value: Value,
}

struct StoreInner {
    slots: IndexMap<String, Slot>,
    outputs_generation: u64,
}

impl StoreInner {
    fn slot(&self, name: &str) -> Result<&Slot, StoreError> {
        self.slots.get(name).ok_or_else(|| StoreError::UnknownVariable {
            name: name.to_string(),
        })
    }
}

/// Thread-safe registry of named, typed variables.
///
/// Shared between the synchronization driver and external request
/// handlers via `Arc<VariableStore>`. The set of variables is fixed at
/// construction.
///
/// # Examples
///
/// ```
/// use twinsync_core::{StoreError, Value, VariableDef, VariableKind};
/// use twinsync_store::VariableStore;
///
/// let store = VariableStore::new(vec![
///     VariableDef::input("setpoint", Value::Real(323.15)),
///     VariableDef::output("temperature", VariableKind::Real),
/// ])
/// .unwrap();
///
/// store.write("setpoint", Value::Real(330.0)).unwrap();
/// assert_eq!(store.read("setpoint").unwrap(), Value::Real(330.0));
///
/// let err = store.write("temperature", Value::Real(1.0)).unwrap_err();
/// assert!(matches!(err, StoreError::NotWritable { .. }));
/// ```
pub struct VariableStore {
    inner: Mutex<StoreInner>,
    definitions: Vec<VariableDef>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    lock_timeout: Duration,
}

impl VariableStore {
    /// Build a store from variable definitions.
    ///
    /// Fails with [`StoreError::DuplicateVariable`] if two definitions
    /// share a name, or [`StoreError::TypeMismatch`] if a definition's
    /// initial value disagrees with its declared kind.
    pub fn new(definitions: Vec<VariableDef>) -> Result<Self, StoreError> {
        let mut slots = IndexMap::with_capacity(definitions.len());
        for def in &definitions {
            if def.initial.kind() != def.kind {
                return Err(StoreError::TypeMismatch {
                    name: def.name.clone(),
                    expected: def.kind,
                    actual: def.initial.kind(),
                });
            }
            let slot = Slot {
                kind: def.kind,
                writable: def.writable,
                value: def.initial,
            };
            if slots.insert(def.name.clone(), slot).is_some() {
                return Err(StoreError::DuplicateVariable {
                    name: def.name.clone(),
                });
            }
        }

        let input_names = definitions
            .iter()
            .filter(|d| d.writable)
            .map(|d| d.name.clone())
            .collect();
        let output_names = definitions
            .iter()
            .filter(|d| !d.writable)
            .map(|d| d.name.clone())
            .collect();

        Ok(Self {
            inner: Mutex::new(StoreInner {
                slots,
                outputs_generation: 0,
            }),
            definitions,
            input_names,
            output_names,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        })
    }

    /// Override the bounded wait on the store mutex.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>, StoreError> {
        self.inner
            .try_lock_for(self.lock_timeout)
            .ok_or(StoreError::LockTimeout {
                waited_ms: self.lock_timeout.as_millis() as u64,
            })
    }

    /// Read one variable.
    pub fn read(&self, name: &str) -> Result<Value, StoreError> {
        let inner = self.lock()?;
        Ok(inner.slot(name)?.value)
    }

    /// Read several variables in one critical section.
    ///
    /// Fails with [`StoreError::UnknownVariable`] on the first name that
    /// is not registered; nothing is returned in that case.
    pub fn read_all<S: AsRef<str>>(&self, names: &[S]) -> Result<ExchangeSnapshot, StoreError> {
        let inner = self.lock()?;
        let mut snapshot = ExchangeSnapshot::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            snapshot.push(name, inner.slot(name)?.value);
        }
        Ok(snapshot)
    }

    /// Read every output variable in one critical section.
    pub fn read_outputs(&self) -> Result<ExchangeSnapshot, StoreError> {
        self.read_all(&self.output_names)
    }

    /// Write a single variable on behalf of the external interface.
    ///
    /// Rejected with [`StoreError::NotWritable`] for read-only variables
    /// and [`StoreError::TypeMismatch`] when the value's kind differs from
    /// the declaration. A rejected write leaves the prior value intact.
    pub fn write(&self, name: &str, value: Value) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let slot = inner
            .slots
            .get_mut(name)
            .ok_or_else(|| StoreError::UnknownVariable {
                name: name.to_string(),
            })?;
        if !slot.writable {
            return Err(StoreError::NotWritable {
                name: name.to_string(),
            });
        }
        if value.kind() != slot.kind {
            return Err(StoreError::TypeMismatch {
                name: name.to_string(),
                expected: slot.kind,
                actual: value.kind(),
            });
        }
        slot.value = value;
        Ok(())
    }

    /// Replace a batch of output values in one critical section.
    ///
    /// The whole batch is validated before any value changes: every entry
    /// must name a registered, non-writable variable of the right kind.
    /// Returns the new outputs generation.
    pub fn write_outputs(&self, outputs: &ExchangeSnapshot) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        for (name, value) in outputs.iter() {
            let slot = inner.slot(name)?;
            if slot.writable {
                return Err(StoreError::NotAnOutput {
                    name: name.to_string(),
                });
            }
            if value.kind() != slot.kind {
                return Err(StoreError::TypeMismatch {
                    name: name.to_string(),
                    expected: slot.kind,
                    actual: value.kind(),
                });
            }
        }
        for (name, value) in outputs.iter() {
            if let Some(slot) = inner.slots.get_mut(name) {
                slot.value = value;
            }
        }
        inner.outputs_generation += 1;
        Ok(inner.outputs_generation)
    }

    /// Number of output batches applied so far.
    pub fn outputs_generation(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.outputs_generation)
    }

    /// Names of writable (input) variables, in definition order.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// Names of read-only (output) variables, in definition order.
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// The definitions this store was built from.
    pub fn definitions(&self) -> &[VariableDef] {
        &self.definitions
    }

    /// Look up a definition by name.
    pub fn definition(&self, name: &str) -> Option<&VariableDef> {
        self.definitions.iter().find(|d| d.name == name)
    }
}

impl std::fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableStore")
            .field("inputs", &self.input_names)
            .field("outputs", &self.output_names)
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}
