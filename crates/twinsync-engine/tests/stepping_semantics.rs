//! Integration tests: cycle semantics through the public API, without
//! threads.

use proptest::prelude::*;

use twinsync_core::{StepError, Value};
use twinsync_engine::{bootstrap, run_cycle, CycleError, SteppingEngine, SyncConfig};
use twinsync_store::VariableStore;
use twinsync_test_utils::{fixture_layout, FixtureProvider, ScriptedModel};

fn bootstrapped(
    model: fn() -> ScriptedModel,
    config: &SyncConfig,
) -> (SteppingEngine, VariableStore) {
    let provider = FixtureProvider::new("scripted", model);
    let store = VariableStore::new(fixture_layout()).unwrap();
    let engine = bootstrap(&provider, "scripted", &store, config).unwrap();
    (engine, store)
}

#[test]
fn one_cycle_with_ten_second_step() {
    let (mut engine, store) = bootstrapped(ScriptedModel::ramp, &SyncConfig::default());
    assert_eq!(engine.clock().next_sync_point(), 10.0);

    let report = run_cycle(&mut engine, &store);
    assert!(report.is_ok());
    assert_eq!(engine.clock().next_sync_point(), 20.0);
    assert_eq!(store.read("time").unwrap(), Value::Real(10.0));
    assert_eq!(store.read("y").unwrap(), Value::Real(10.0));
}

#[test]
fn events_inside_a_cycle_are_stepped_through() {
    fn eventful() -> ScriptedModel {
        ScriptedModel::ramp().with_event_spacing(0.7)
    }
    let (mut engine, store) = bootstrapped(eventful, &SyncConfig::with_step_size(2.0));

    let report = run_cycle(&mut engine, &store);
    assert!(report.is_ok());
    // 0.7, 1.4, then 2.0.
    assert_eq!(report.metrics.sub_steps, 3);
    assert_eq!(store.read("time").unwrap(), Value::Real(2.0));
}

#[test]
fn stalled_model_fails_the_cycle_without_publishing() {
    fn stuck() -> ScriptedModel {
        ScriptedModel::ramp().stalling()
    }
    let config = SyncConfig {
        max_sub_steps: 8,
        ..SyncConfig::with_step_size(1.0)
    };
    let (mut engine, store) = bootstrapped(stuck, &config);

    let report = run_cycle(&mut engine, &store);
    assert!(matches!(
        report.outcome,
        Err(CycleError::Step(StepError::IntegrationFailure { .. }))
    ));
    assert_eq!(report.metrics.sub_steps, 8);
    assert_eq!(store.outputs_generation().unwrap(), 1);
    assert_eq!(engine.clock().next_sync_point(), 2.0);
}

#[test]
fn rejected_input_fails_the_cycle_and_recovers() {
    fn bounded() -> ScriptedModel {
        ScriptedModel::ramp().with_input_range(0.0, 5.0)
    }
    let (mut engine, store) = bootstrapped(bounded, &SyncConfig::with_step_size(1.0));

    store.write("u", Value::Real(9.0)).unwrap();
    let report = run_cycle(&mut engine, &store);
    assert!(matches!(
        report.outcome,
        Err(CycleError::Step(StepError::InputRejected { ref name, .. })) if name == "u"
    ));
    assert_eq!(store.read("time").unwrap(), Value::Real(0.0));

    store.write("u", Value::Real(2.0)).unwrap();
    let report = run_cycle(&mut engine, &store);
    assert!(report.is_ok());
    // The failed cycle's interval was skipped, not replayed.
    assert_eq!(report.target, 2.0);
    assert_eq!(store.read("time").unwrap(), Value::Real(2.0));
    assert_eq!(store.read("y").unwrap(), Value::Real(4.0));
}

proptest! {
    #[test]
    fn advance_reaches_target_within_epsilon(
        spacing in 0.05f64..5.0,
        step in 0.1f64..20.0,
    ) {
        let config = SyncConfig::with_step_size(step);
        let mut engine = SteppingEngine::new(
            Box::new(ScriptedModel::ramp().with_event_spacing(spacing)),
            vec!["u".to_string()],
            vec!["time".to_string()],
            &config,
        )
        .unwrap();
        let inputs = [("u", Value::Real(1.0))].into_iter().collect();
        engine.initialize(&inputs).unwrap();

        for _ in 0..3 {
            let target = engine.clock().next_sync_point();
            let outputs = engine.sync_cycle(&inputs).unwrap();
            let time = outputs.get("time").and_then(|v| v.as_real()).unwrap();
            prop_assert!(time >= target - config.epsilon);
            prop_assert!(time <= target);
            prop_assert!(engine.last_metrics().sub_steps >= 1);
        }
    }
}
