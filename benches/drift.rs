//! Benchmarks for drift detection and federated averaging.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use heartcare::core::Fingerprint;
use heartcare::drift::DriftDetector;
use heartcare::federated::{federated_average, LocalUpdate};
use heartcare::simulation::heart_rate_stream;

fn bench_detector_stationary(c: &mut Criterion) {
    let stream = heart_rate_stream(10_000, 70.0, 2.0, usize::MAX, 0.0, 1);
    c.bench_function("detector_stationary_10k", |b| {
        b.iter(|| {
            let mut detector = DriftDetector::default();
            for &v in &stream {
                black_box(detector.update(v));
            }
            black_box(detector.bucket_count())
        });
    });
}

fn bench_detector_step(c: &mut Criterion) {
    let stream = heart_rate_stream(1_000, 70.0, 2.0, 500, 20.0, 2);
    c.bench_function("detector_step_1k", |b| {
        b.iter(|| {
            let mut detector = DriftDetector::default();
            black_box(stream.iter().position(|&v| detector.update(v)))
        });
    });
}

fn bench_federated_average(c: &mut Criterion) {
    let updates: Vec<LocalUpdate> = (0..16)
        .map(|i| LocalUpdate {
            cohort: format!("cohort{}", i),
            weights: (0..64).map(|j| (i * j) as f64 * 0.01).collect(),
            bias: i as f64,
            samples: 100,
            fingerprint: Fingerprint::of(&[i as u8]),
        })
        .collect();
    c.bench_function("fedavg_16x64", |b| {
        b.iter(|| black_box(federated_average(1, &updates).expect("average must succeed")));
    });
}

criterion_group!(
    benches,
    bench_detector_stationary,
    bench_detector_step,
    bench_federated_average
);
criterion_main!(benches);
