//! Criterion benchmarks for the disaggregation pipeline.
//!
//! Decoding is O(T·N²) in the joint state count N, so the groups sweep the
//! number of two-state appliances.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fhmm_core::fhmm::{combine, decode, Engine};
use fhmm_core::model::{ApplianceModel, OnOffParams};

fn appliances(n: usize) -> Vec<ApplianceModel> {
    (0..n)
        .map(|i| {
            ApplianceModel::on_off(
                format!("dev{}", i),
                OnOffParams {
                    on_mean: 40.0 * (1 << i) as f64,
                    p_stay_on: 0.8,
                    p_stay_off: 0.95,
                    p_on_prior: 0.1,
                    var_on: 25.0,
                    var_off: 1.0,
                },
            )
            .unwrap()
        })
        .collect()
}

/// Deterministic aggregate trace that switches appliances on and off.
fn trace(models: &[ApplianceModel], steps: usize) -> Vec<f64> {
    (0..steps)
        .map(|t| {
            models
                .iter()
                .enumerate()
                .filter(|(i, _)| (t / (3 + i)) % 2 == 1)
                .map(|(_, m)| m.means()[1])
                .sum::<f64>()
                + (t % 7) as f64
        })
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.sample_size(20);

    for n in [2usize, 4, 6] {
        let models = appliances(n);
        let obs = trace(&models, 500);
        let combination = combine(&models, 5.0).unwrap();
        group.bench_with_input(BenchmarkId::new("viterbi_500", n), &obs, |b, obs| {
            b.iter(|| black_box(decode(black_box(&combination.fhmm), black_box(obs))));
        });
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);

    for n in [2usize, 4] {
        let models = appliances(n);
        let obs = trace(&models, 500);
        let engine = Engine::default();
        group.bench_with_input(BenchmarkId::new("disaggregate_500", n), &obs, |b, obs| {
            b.iter(|| black_box(engine.disaggregate(black_box(&models), black_box(obs))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_pipeline);
criterion_main!(benches);
