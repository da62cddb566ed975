//! Startup: instantiate the model, apply initial values, initialize, and
//! publish the initial outputs before the driver takes over.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use tracing::info;
use twinsync_core::{InitError, ModelProvider, VariableDef};
use twinsync_store::VariableStore;

use crate::config::{ConfigError, SyncConfig};
use crate::driver::SyncDriver;
use crate::stepping::SteppingEngine;

/// Errors that prevent the system from starting. All are fatal.
#[derive(Debug, PartialEq)]
pub enum StartupError {
    /// Invalid configuration or store layout.
    Config(ConfigError),
    /// The variable definitions could not form a store.
    Store(twinsync_core::StoreError),
    /// Model instantiation or initialization failed.
    Init(InitError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Store(e) => write!(f, "variable store: {e}"),
            Self::Init(e) => write!(f, "initialization: {e}"),
        }
    }
}

impl Error for StartupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Init(e) => Some(e),
        }
    }
}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<InitError> for StartupError {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

/// Instantiate `model_ref` and bring it to its initial state.
///
/// Initial input values are read from `store` (its defaults, or whatever
/// was written before startup), and the model's outputs at the initial
/// time are published so readers never see placeholder zeros once this
/// returns.
pub fn bootstrap(
    provider: &dyn ModelProvider,
    model_ref: &str,
    store: &VariableStore,
    config: &SyncConfig,
) -> Result<SteppingEngine, StartupError> {
    let model = provider
        .instantiate(model_ref, model_ref)
        .map_err(InitError::Instantiation)?;
    let mut engine = SteppingEngine::new(
        model,
        store.input_names().to_vec(),
        store.output_names().to_vec(),
        config,
    )?;

    let inputs = store
        .read_all(store.input_names())
        .map_err(InitError::from)?;
    let outputs = engine.initialize(&inputs)?;
    store.write_outputs(&outputs).map_err(InitError::from)?;

    info!(
        model = model_ref,
        inputs = store.input_names().len(),
        outputs = store.output_names().len(),
        sim_time = engine.clock().current_time(),
        "model initialized"
    );
    Ok(engine)
}

/// Build the store from `definitions`, bootstrap the model, and start the
/// driver.
pub fn start(
    provider: &dyn ModelProvider,
    model_ref: &str,
    definitions: Vec<VariableDef>,
    config: SyncConfig,
) -> Result<SyncDriver, StartupError> {
    config.validate()?;
    let store = VariableStore::new(definitions)
        .map_err(StartupError::Store)?
        .with_lock_timeout(config.store_lock_timeout());
    let store = Arc::new(store);
    let engine = bootstrap(provider, model_ref, &store, &config)?;
    Ok(SyncDriver::start(engine, store, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use twinsync_core::{ModelError, StoreError, Value};
    use twinsync_test_utils::{fixture_layout, FixtureProvider, ScriptedModel};

    #[test]
    fn bootstrap_publishes_initial_outputs() {
        let provider = FixtureProvider::new("ramp", ScriptedModel::ramp);
        let store = VariableStore::new(fixture_layout()).unwrap();
        let engine = bootstrap(&provider, "ramp", &store, &SyncConfig::default()).unwrap();

        assert_eq!(engine.model().name(), "ramp");
        assert_eq!(store.outputs_generation().unwrap(), 1);
        assert_eq!(store.read("time").unwrap(), Value::Real(0.0));
        // Initial input reached the model.
        assert_eq!(engine.model().get_output("u").unwrap(), Value::Real(1.0));
    }

    #[test]
    fn unknown_model_reference_is_fatal() {
        let provider = FixtureProvider::new("ramp", ScriptedModel::ramp);
        let store = VariableStore::new(fixture_layout()).unwrap();
        let err = bootstrap(&provider, "other", &store, &SyncConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            StartupError::Init(InitError::Instantiation(ModelError::InstantiationFailed { .. }))
        ));
    }

    #[test]
    fn failed_initialization_is_fatal() {
        let provider = FixtureProvider::new("ramp", || ScriptedModel::ramp().failing_initialize());
        let store = VariableStore::new(fixture_layout()).unwrap();
        let err = bootstrap(&provider, "ramp", &store, &SyncConfig::default()).unwrap_err();
        assert!(matches!(err, StartupError::Init(InitError::Initialization(_))));
        assert_eq!(store.outputs_generation().unwrap(), 0);
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let provider = FixtureProvider::new("ramp", ScriptedModel::ramp);
        let mut defs = fixture_layout();
        defs.push(VariableDef::input("u", Value::Real(0.0)));
        let err = start(&provider, "ramp", defs, SyncConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            StartupError::Store(StoreError::DuplicateVariable { .. })
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_instantiation() {
        let provider = FixtureProvider::new("ramp", ScriptedModel::ramp);
        let err = start(
            &provider,
            "ramp",
            fixture_layout(),
            SyncConfig::with_step_size(0.0),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::InvalidStepSize { .. })
        ));
    }
}
