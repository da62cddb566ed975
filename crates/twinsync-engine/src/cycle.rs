//! One synchronization cycle: read inputs, step, publish outputs.

use std::error::Error;
use std::fmt;
use std::time::Instant;

use tracing::{debug, warn};
use twinsync_core::{ExchangeSnapshot, StepError, StoreError};
use twinsync_store::VariableStore;

use crate::metrics::CycleMetrics;
use crate::stepping::SteppingEngine;

/// Why a cycle did not publish fresh outputs.
#[derive(Debug, PartialEq)]
pub enum CycleError {
    /// The model step failed. Previously published outputs are retained.
    Step(StepError),
    /// The step succeeded but the outputs could not be published.
    Publish(StoreError),
}

impl fmt::Display for CycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(e) => write!(f, "step failed: {e}"),
            Self::Publish(e) => write!(f, "publishing outputs failed: {e}"),
        }
    }
}

impl Error for CycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Step(e) => Some(e),
            Self::Publish(e) => Some(e),
        }
    }
}

/// Outcome of a single [`run_cycle`] call.
#[derive(Debug)]
pub struct CycleReport {
    /// The synchronization point this cycle targeted.
    pub target: f64,
    /// Simulated time reached.
    pub reached: f64,
    /// Output generation published, or why nothing was published.
    pub outcome: Result<u64, CycleError>,
    /// Inputs could not be read; the model kept its previous inputs.
    pub stale_inputs: bool,
    /// Timing and sub-step data.
    pub metrics: CycleMetrics,
}

impl CycleReport {
    /// Whether fresh outputs were published.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Run one cycle against `store`.
///
/// Inputs are snapshotted from the store under one lock acquisition and
/// outputs are published under another, so the store is never locked
/// while the model integrates. If the input read fails (lock timeout),
/// the cycle still steps, with the inputs the model already holds.
///
/// The engine's clock advances whatever the outcome.
pub fn run_cycle(engine: &mut SteppingEngine, store: &VariableStore) -> CycleReport {
    let start = Instant::now();
    let target = engine.clock().next_sync_point();

    let read_start = Instant::now();
    let (inputs, stale_inputs) = match store.read_all(engine.input_names()) {
        Ok(inputs) => (inputs, false),
        Err(e) => {
            warn!(error = %e, target, "input read failed, stepping with previous inputs");
            (ExchangeSnapshot::new(), true)
        }
    };
    let read_us = read_start.elapsed().as_micros() as u64;

    let step_result = engine.sync_cycle(&inputs);
    let mut metrics = engine.last_metrics().clone();
    metrics.read_us = read_us;

    let publish_start = Instant::now();
    let outcome = match step_result {
        Ok(outputs) => store.write_outputs(&outputs).map_err(CycleError::Publish),
        Err(e) => Err(CycleError::Step(e)),
    };
    metrics.publish_us = publish_start.elapsed().as_micros() as u64;
    metrics.total_us = start.elapsed().as_micros() as u64;

    match &outcome {
        Ok(generation) => debug!(
            target,
            reached = metrics.reached_time,
            sub_steps = metrics.sub_steps,
            generation,
            total_us = metrics.total_us,
            "cycle complete"
        ),
        Err(e) => warn!(
            target,
            reached = metrics.reached_time,
            error = %e,
            "cycle failed, previous outputs retained"
        ),
    }

    CycleReport {
        target,
        reached: metrics.reached_time,
        outcome,
        stale_inputs,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use twinsync_core::Value;
    use twinsync_test_utils::{fixture_layout, ScriptedModel};

    fn setup(model: ScriptedModel, step: f64) -> (SteppingEngine, VariableStore) {
        let store = VariableStore::new(fixture_layout()).unwrap();
        let mut engine = SteppingEngine::new(
            Box::new(model),
            store.input_names().to_vec(),
            store.output_names().to_vec(),
            &SyncConfig::with_step_size(step),
        )
        .unwrap();
        let inputs = store.read_all(store.input_names()).unwrap();
        let outputs = engine.initialize(&inputs).unwrap();
        store.write_outputs(&outputs).unwrap();
        (engine, store)
    }

    #[test]
    fn publishes_outputs_at_sync_point() {
        let (mut engine, store) = setup(ScriptedModel::ramp(), 10.0);
        store.write("u", Value::Real(0.5)).unwrap();

        let report = run_cycle(&mut engine, &store);
        assert!(report.is_ok());
        assert_eq!(report.target, 10.0);
        assert_eq!(report.reached, 10.0);
        assert!(!report.stale_inputs);
        assert_eq!(store.read("time").unwrap(), Value::Real(10.0));
        assert_eq!(store.read("y").unwrap(), Value::Real(5.0));
        assert_eq!(engine.clock().next_sync_point(), 20.0);
    }

    #[test]
    fn step_failure_retains_outputs() {
        let (mut engine, store) = setup(ScriptedModel::ramp().fail_after_integrations(1), 10.0);
        assert!(run_cycle(&mut engine, &store).is_ok());
        let generation = store.outputs_generation().unwrap();

        let report = run_cycle(&mut engine, &store);
        assert!(matches!(
            report.outcome,
            Err(CycleError::Step(StepError::IntegrationFailure { .. }))
        ));
        assert_eq!(store.read("time").unwrap(), Value::Real(10.0));
        assert_eq!(store.outputs_generation().unwrap(), generation);
        assert_eq!(engine.clock().next_sync_point(), 30.0);
    }

    #[test]
    fn failed_input_read_steps_with_previous_inputs() {
        let store = VariableStore::new(fixture_layout()).unwrap();
        let mut engine = SteppingEngine::new(
            Box::new(ScriptedModel::ramp()),
            vec!["u".to_string(), "not_registered".to_string()],
            store.output_names().to_vec(),
            &SyncConfig::with_step_size(1.0),
        )
        .unwrap();
        let inputs = store.read_all(&["u", "enabled"]).unwrap();
        engine.initialize(&inputs).unwrap();
        store.write("u", Value::Real(4.0)).unwrap();

        let report = run_cycle(&mut engine, &store);
        assert!(report.stale_inputs);
        assert!(report.is_ok());
        // The model kept u = 1.0 from initialization.
        assert_eq!(store.read("y").unwrap(), Value::Real(1.0));
        assert_eq!(store.read("time").unwrap(), Value::Real(1.0));
    }
}
