//! End-to-end optimizer throughput: full multi-strategy runs and single
//! annealing passes.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::json;
use std::collections::BTreeMap;

use mendel::catalog::Catalog;
use mendel::garden::full_unlocked;
use mendel::optimizer::{
    AnnealingParams, MultiStrategyOptimizer, Objective, ObjectiveConfig, Workload,
};

fn catalog() -> Catalog {
    serde_json::from_value(json!({
        "berry": { "name": "Berry", "size": "1x1", "tier": 2,
                   "conditions": { "wheat": 1, "potato": 1 } },
        "oak": { "name": "Oak", "size": "2x2", "tier": 3,
                 "conditions": { "wheat": 2 } },
        "hermit": { "name": "Hermit", "size": "1x1", "tier": 1,
                    "conditions": { "adjacent_crops": 0 } }
    }))
    .unwrap()
}

fn short_annealing() -> AnnealingParams {
    AnnealingParams {
        initial_temperature: 20.0,
        floor_temperature: 1.0,
        iterations_per_step: 10,
        max_reheats: 1,
        ..AnnealingParams::default()
    }
}

fn bench_multi_strategy(c: &mut Criterion) {
    let workload: Workload = BTreeMap::from([
        ("berry".to_string(), 8),
        ("oak".to_string(), 2),
        ("hermit".to_string(), 1),
    ]);

    let mut group = c.benchmark_group("multi_strategy");
    group.sample_size(10);
    group.bench_function("mixed_workload", |b| {
        b.iter_batched(
            || MultiStrategyOptimizer::with_seed(catalog(), 7).with_annealing(short_annealing()),
            |mut optimizer| optimizer.optimize(&workload, &full_unlocked()).unwrap(),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_bulk_workload(c: &mut Criterion) {
    let workload: Workload = BTreeMap::from([("berry".to_string(), 50)]);

    let mut group = c.benchmark_group("bulk");
    group.sample_size(10);
    group.bench_function("dominant_50", |b| {
        b.iter_batched(
            || MultiStrategyOptimizer::with_seed(catalog(), 7).with_annealing(short_annealing()),
            |mut optimizer| {
                optimizer
                    .optimize_all(&workload, &full_unlocked())
                    .unwrap()
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_objective(c: &mut Criterion) {
    let allowed = vec!["berry".to_string(), "oak".to_string()];
    let config = ObjectiveConfig::quick(Objective::MaxCount);

    let mut group = c.benchmark_group("objective");
    group.sample_size(10);
    group.bench_function("quick_count", |b| {
        b.iter(|| {
            mendel::optimize_layout(catalog(), &full_unlocked(), &allowed, &config, 3).unwrap()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_multi_strategy,
    bench_bulk_workload,
    bench_objective
);
criterion_main!(benches);
