//! Criterion micro-benchmarks for variable store reads, writes, and
//! output publication.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use twinsync_core::{ExchangeSnapshot, Value};
use twinsync_models::teststand::{self, OUTPUTS, T_RETURN_SECONDARY_SET};
use twinsync_store::VariableStore;

fn outputs(v: f64) -> ExchangeSnapshot {
    OUTPUTS.iter().map(|name| (*name, Value::Real(v))).collect()
}

fn bench_read_inputs(c: &mut Criterion) {
    let store = VariableStore::new(teststand::layout()).unwrap();
    let names = store.input_names().to_vec();
    c.bench_function("store_read_all_inputs", |b| {
        b.iter(|| black_box(store.read_all(&names).unwrap()));
    });
}

fn bench_write(c: &mut Criterion) {
    let store = VariableStore::new(teststand::layout()).unwrap();
    let mut v = 300.0;
    c.bench_function("store_write_input", |b| {
        b.iter(|| {
            v += 0.001;
            store
                .write(T_RETURN_SECONDARY_SET, black_box(Value::Real(v)))
                .unwrap();
        });
    });
}

fn bench_publish(c: &mut Criterion) {
    let store = VariableStore::new(teststand::layout()).unwrap();
    let batch = outputs(330.0);
    c.bench_function("store_write_outputs", |b| {
        b.iter(|| black_box(store.write_outputs(&batch).unwrap()));
    });
}

criterion_group!(benches, bench_read_inputs, bench_write, bench_publish);
criterion_main!(benches);
