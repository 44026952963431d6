//! Benchmarks for the reactive core: cells, deriveds, computations, stores
//!
//! Run with: cargo bench --bench signals

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_reconcile::{batch, create_computation, create_derived, signal, wrap, Value};

// =============================================================================
// SIGNAL BENCHMARKS
// =============================================================================

fn bench_signal_get(c: &mut Criterion) {
    let s = signal(42i32);
    c.bench_function("signal_get", |b| b.iter(|| black_box(s.get())));
}

fn bench_signal_set(c: &mut Criterion) {
    let s = signal(0i32);
    let mut i = 0i32;
    c.bench_function("signal_set", |b| {
        b.iter(|| {
            i += 1;
            s.set(black_box(i))
        })
    });
}

fn bench_signal_set_same_value(c: &mut Criterion) {
    let s = signal(42i32);
    c.bench_function("signal_set_same_value", |b| b.iter(|| s.set(black_box(42))));
}

// =============================================================================
// DERIVED BENCHMARKS
// =============================================================================

fn bench_derived_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_chain");

    for depth in [1, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, &depth| {
            let s = signal(1i32);
            let mut current = {
                let s = s.clone();
                create_derived(move || s.get() + 1)
            };
            for _ in 1..depth {
                let prev = current.clone();
                current = create_derived(move || prev.get() + 1);
            }

            let mut i = 0i32;
            b.iter(|| {
                i += 1;
                s.set(black_box(i));
                black_box(current.get())
            })
        });
    }

    group.finish();
}

// =============================================================================
// COMPUTATION BENCHMARKS
// =============================================================================

fn bench_computation_trigger(c: &mut Criterion) {
    let s = signal(0i32);
    let _c = create_computation({
        let s = s.clone();
        move || {
            black_box(s.get());
        }
    });

    let mut i = 0i32;
    c.bench_function("computation_trigger", |b| {
        b.iter(|| {
            i += 1;
            s.set(i);
        })
    });
}

fn bench_batch_updates(c: &mut Criterion) {
    let s = signal(0i32);
    let _c = create_computation({
        let s = s.clone();
        move || {
            black_box(s.get());
        }
    });

    let mut base = 0i32;
    c.bench_function("batch_10_updates", |b| {
        b.iter(|| {
            batch(|| {
                for i in 0..10 {
                    s.set(black_box(base + i));
                }
            });
            base += 10;
        })
    });
}

fn bench_many_computations(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_computations");

    for count in [10, 100, 500] {
        group.bench_with_input(BenchmarkId::new("trigger", count), &count, |b, &count| {
            let s = signal(0i32);
            let computations: Vec<_> = (0..count)
                .map(|_| {
                    let s = s.clone();
                    create_computation(move || {
                        black_box(s.get());
                    })
                })
                .collect();

            let mut i = 0i32;
            b.iter(|| {
                i += 1;
                s.set(i);
            });

            drop(computations);
        });
    }

    group.finish();
}

// =============================================================================
// STORE BENCHMARKS
// =============================================================================

fn bench_store_field_write(c: &mut Criterion) {
    let state = wrap(&Value::map([("a", 0), ("b", 0)])).unwrap_or_else(|e| panic!("{e}"));
    let _c = create_computation({
        let state = state.clone();
        move || {
            black_box(state.get("a").ok());
        }
    });

    let mut i = 0i32;
    c.bench_function("store_field_write", |b| {
        b.iter(|| {
            i += 1;
            state.set("a", i).ok()
        })
    });
}

fn bench_store_untracked_field_write(c: &mut Criterion) {
    let state = wrap(&Value::map([("a", 0), ("b", 0)])).unwrap_or_else(|e| panic!("{e}"));
    let _c = create_computation({
        let state = state.clone();
        move || {
            black_box(state.get("a").ok());
        }
    });

    // Nobody reads "b": the write finds no trigger
    let mut i = 0i32;
    c.bench_function("store_untracked_field_write", |b| {
        b.iter(|| {
            i += 1;
            state.set("b", i).ok()
        })
    });
}

criterion_group!(
    signal_benches,
    bench_signal_get,
    bench_signal_set,
    bench_signal_set_same_value,
);

criterion_group!(derived_benches, bench_derived_chain);

criterion_group!(
    computation_benches,
    bench_computation_trigger,
    bench_batch_updates,
    bench_many_computations,
);

criterion_group!(
    store_benches,
    bench_store_field_write,
    bench_store_untracked_field_write,
);

criterion_main!(signal_benches, derived_benches, computation_benches, store_benches);
