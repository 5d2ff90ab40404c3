use criterion::{black_box, criterion_group, criterion_main, Criterion};

use scantrend_core::model::ScoreScale;
use scantrend_core::statistics::{percentile, score_distribution, PopulationStats};

fn make_scores(n: usize) -> Vec<f64> {
    (0..n).map(|i| 1.0 + ((i * 37) % 41) as f64 / 10.0).collect()
}

fn bench_population_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("population_stats");

    for n in [100usize, 10_000, 100_000] {
        let scores = make_scores(n);
        group.bench_function(format!("n={n}"), |b| {
            b.iter(|| PopulationStats::compute(black_box(&scores)))
        });
    }

    group.finish();
}

fn bench_percentile(c: &mut Criterion) {
    let mut sorted = make_scores(10_000);
    sorted.sort_by(f64::total_cmp);

    c.bench_function("percentile_p90_sorted", |b| {
        b.iter(|| percentile(black_box(&sorted), black_box(90.0)))
    });
}

fn bench_distribution(c: &mut Criterion) {
    let scores = make_scores(10_000);
    let scale = ScoreScale::default();

    c.bench_function("score_distribution_10k", |b| {
        b.iter(|| score_distribution(black_box(scores.iter().copied()), black_box(&scale)))
    });
}

criterion_group!(
    benches,
    bench_population_stats,
    bench_percentile,
    bench_distribution
);
criterion_main!(benches);
