//! Benchmark profiles for the twinsync engine.
//!
//! - [`idle_teststand`]: test stand with default inputs (no heat transfer)
//! - [`controlled_teststand`]: valve under PI control, producing
//!   saturation events inside cycles

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use twinsync_core::Value;
use twinsync_engine::{bootstrap, SteppingEngine, SyncConfig};
use twinsync_models::teststand::{self, *};
use twinsync_models::SubstationProvider;
use twinsync_store::VariableStore;

/// Store and bootstrapped engine for the test stand at default inputs.
pub fn idle_teststand(step_size: f64) -> (SteppingEngine, VariableStore) {
    build(step_size, &[])
}

/// Store and bootstrapped engine with the secondary supply temperature
/// under valve control.
pub fn controlled_teststand(step_size: f64) -> (SteppingEngine, VariableStore) {
    build(
        step_size,
        &[
            (T_SUPPLY_PRIMARY_SET, Value::Real(373.15)),
            (DELTA_P_PRIMARY_SET, Value::Real(400_000.0)),
            (M_FLOW_RETURN_SECONDARY, Value::Real(1.0)),
            (T_SUPPLY_SECONDARY_CTRL, Value::Boolean(true)),
        ],
    )
}

fn build(step_size: f64, writes: &[(&str, Value)]) -> (SteppingEngine, VariableStore) {
    let store = VariableStore::new(teststand::layout()).unwrap();
    for &(name, value) in writes {
        store.write(name, value).unwrap();
    }
    let engine = bootstrap(
        &SubstationProvider::default(),
        MODEL_REF,
        &store,
        &SyncConfig::with_step_size(step_size),
    )
    .unwrap();
    (engine, store)
}
