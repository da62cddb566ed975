//! Integration test: the substation test stand behind the engine and store.

use std::sync::Arc;

use twinsync_core::{StoreError, Value};
use twinsync_engine::{bootstrap, run_cycle, SyncConfig};
use twinsync_models::teststand::{self, *};
use twinsync_models::SubstationProvider;
use twinsync_store::VariableStore;

fn real(store: &VariableStore, name: &str) -> f64 {
    store.read(name).unwrap().as_real().unwrap()
}

#[test]
fn one_cycle_with_defaults() {
    let store = VariableStore::new(teststand::layout()).unwrap();
    let mut engine = bootstrap(
        &SubstationProvider::default(),
        MODEL_REF,
        &store,
        &SyncConfig::default(),
    )
    .unwrap();

    // Initial outputs were published at time zero.
    assert_eq!(real(&store, T_SUPPLY_SECONDARY), 323.15);
    assert_eq!(engine.clock().next_sync_point(), 10.0);

    let report = run_cycle(&mut engine, &store);
    assert!(report.is_ok());
    assert_eq!(report.reached, 10.0);
    assert_eq!(engine.clock().next_sync_point(), 20.0);
    assert_eq!(engine.model().time(), 10.0);
    assert_eq!(store.outputs_generation().unwrap(), 2);
    // No primary pressure difference: no heat transferred.
    assert_eq!(real(&store, SUBSTATION_HEX_Q2_FLOW), 0.0);
    assert!((real(&store, T_SUPPLY_SECONDARY) - 323.15).abs() < 1e-9);
}

#[test]
fn written_inputs_drive_the_next_cycle() {
    let store = VariableStore::new(teststand::layout()).unwrap();
    let mut engine = bootstrap(
        &SubstationProvider::default(),
        MODEL_REF,
        &store,
        &SyncConfig::with_step_size(30.0),
    )
    .unwrap();

    store
        .write(DELTA_P_PRIMARY_SET, Value::Real(100_000.0))
        .unwrap();
    assert!(run_cycle(&mut engine, &store).is_ok());

    let m1 = real(&store, SUBSTATION_M1_FLOW);
    assert!((m1 - 5e-3 * 100_000f64.sqrt()).abs() < 1e-12);
    assert_eq!(real(&store, M_FLOW_RETURN_PRIMARY), m1);
    assert!(real(&store, SUBSTATION_HEX_Q2_FLOW) > 0.0);
    assert!(real(&store, T_SUPPLY_SECONDARY) > 323.15);
    assert!(real(&store, T_RETURN_PRIMARY) < 353.15);
}

#[test]
fn controlled_valve_events_show_up_as_sub_steps() {
    let store = VariableStore::new(teststand::layout()).unwrap();
    store.write(T_SUPPLY_PRIMARY_SET, Value::Real(373.15)).unwrap();
    store.write(DELTA_P_PRIMARY_SET, Value::Real(400_000.0)).unwrap();
    store.write(M_FLOW_RETURN_SECONDARY, Value::Real(1.0)).unwrap();
    store.write(T_SUPPLY_SECONDARY_CTRL, Value::Boolean(true)).unwrap();

    let mut engine = bootstrap(
        &SubstationProvider::default(),
        MODEL_REF,
        &store,
        &SyncConfig::with_step_size(600.0),
    )
    .unwrap();
    let report = run_cycle(&mut engine, &store);
    assert!(report.is_ok());
    assert!(report.metrics.sub_steps >= 2, "{:?}", report.metrics);
    assert_eq!(report.metrics.event_evaluations, report.metrics.sub_steps);
}

#[test]
fn unreachable_setpoint_does_not_stall_the_twin() {
    let store = VariableStore::new(teststand::layout()).unwrap();
    let mut engine = bootstrap(
        &SubstationProvider::default(),
        MODEL_REF,
        &store,
        &SyncConfig::default(),
    )
    .unwrap();

    // Full opening cannot lift the supply to the setpoint.
    store.write(T_SUPPLY_SECONDARY_CTRL, Value::Boolean(true)).unwrap();
    store.write(DELTA_P_PRIMARY_SET, Value::Real(100_000.0)).unwrap();

    let mut previous = real(&store, T_SUPPLY_SECONDARY);
    for cycle in 1..=5 {
        let report = run_cycle(&mut engine, &store);
        assert!(report.is_ok(), "cycle {cycle}: {:?}", report.outcome);
        assert_eq!(report.reached, 10.0 * cycle as f64);
        assert!(report.metrics.sub_steps <= 2, "{:?}", report.metrics);

        let supply = real(&store, T_SUPPLY_SECONDARY);
        assert!(supply > previous, "supply stuck at {supply}");
        previous = supply;
    }
    assert_eq!(store.outputs_generation().unwrap(), 6);
}

#[test]
fn external_clients_cannot_write_outputs_or_mistype_inputs() {
    let store = Arc::new(VariableStore::new(teststand::layout()).unwrap());
    assert!(matches!(
        store.write(T_SUPPLY_SECONDARY, Value::Real(400.0)),
        Err(StoreError::NotWritable { .. })
    ));
    assert!(matches!(
        store.write(T_RETURN_SECONDARY_SET, Value::Boolean(true)),
        Err(StoreError::TypeMismatch { .. })
    ));
    assert_eq!(real(&store, T_RETURN_SECONDARY_SET), 323.15);
}
