//! Benchmarks for the reconciler and mounted views
//!
//! Run with: cargo bench --bench reconcile

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use spark_reconcile::{mount, signal, LiveNode, Rendered, TargetNode};

fn list(len: usize, changed: Option<usize>) -> TargetNode {
    TargetNode::element("ul").children_from((0..len).map(|i| {
        let text = if Some(i) == changed {
            format!("item {i}*")
        } else {
            format!("item {i}")
        };
        TargetNode::element("li").attr("class", "row").child(text.into())
    }))
}

fn nested(depth: usize, leaf: &str) -> TargetNode {
    (0..depth).fold(TargetNode::text(leaf), |inner, level| {
        TargetNode::element("div")
            .attr("data-level", level.to_string())
            .child(inner)
    })
}

// =============================================================================
// RECONCILE
// =============================================================================

fn bench_reconcile_identical(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_identical");
    for len in [10, 100, 1000] {
        let target = list(len, None);
        let live = LiveNode::materialize(&target);
        group.bench_with_input(BenchmarkId::new("wide", len), &len, |b, _| {
            b.iter(|| live.reconcile(black_box(&target)))
        });
    }
    group.finish();
}

fn bench_reconcile_one_change(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_one_change");
    for len in [10, 100, 1000] {
        let live = LiveNode::materialize(&list(len, None));
        let a = list(len, Some(len / 2));
        let b_target = list(len, None);
        group.bench_with_input(BenchmarkId::new("wide", len), &len, |b, _| {
            b.iter(|| {
                live.reconcile(black_box(&a)).ok();
                live.reconcile(black_box(&b_target)).ok();
            })
        });
    }
    group.finish();
}

fn bench_reconcile_deep(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile_deep");
    for depth in [10, 50, 200] {
        let live = LiveNode::materialize(&nested(depth, "a"));
        let a = nested(depth, "b");
        let b_target = nested(depth, "a");
        group.bench_with_input(BenchmarkId::new("depth", depth), &depth, |b, _| {
            b.iter(|| {
                live.reconcile(black_box(&a)).ok();
                live.reconcile(black_box(&b_target)).ok();
            })
        });
    }
    group.finish();
}

fn bench_reconcile_grow_shrink(c: &mut Criterion) {
    let live = LiveNode::materialize(&list(50, None));
    let grown = list(100, None);
    let shrunk = list(50, None);
    c.bench_function("reconcile_grow_shrink_50", |b| {
        b.iter(|| {
            live.reconcile(black_box(&grown)).ok();
            live.reconcile(black_box(&shrunk)).ok();
        })
    });
}

fn bench_materialize(c: &mut Criterion) {
    let target = list(1000, None);
    c.bench_function("materialize_1000", |b| {
        b.iter(|| black_box(LiveNode::materialize(&target)))
    });
}

// =============================================================================
// MOUNTED VIEW
// =============================================================================

fn bench_view_update(c: &mut Criterion) {
    let selected = signal(0usize);
    let view = mount({
        let selected = selected.clone();
        move || Rendered::from(list(100, Some(selected.get())))
    });

    let mut i = 0usize;
    c.bench_function("view_update_100", |b| {
        b.iter(|| {
            i = (i + 1) % 100;
            selected.set(i);
        })
    });
    drop(view);
}

criterion_group!(
    reconcile_benches,
    bench_reconcile_identical,
    bench_reconcile_one_change,
    bench_reconcile_deep,
    bench_reconcile_grow_shrink,
    bench_materialize,
);

criterion_group!(view_benches, bench_view_update);

criterion_main!(reconcile_benches, view_benches);
