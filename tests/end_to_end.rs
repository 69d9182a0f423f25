//! Full lifecycle on simulated cohorts with file-backed stores.

use heartcare::config::{AggregatorConfig, DriftConfig, TrainerConfig};
use heartcare::data::{CohortDataset, DatasetProvider, InMemoryDatasetProvider};
use heartcare::drift::DriftDetector;
use heartcare::federated::{FederatedAggregator, LocalTrainer};
use heartcare::metrics::{FileMetricsSink, MetricsSink, Stage};
use heartcare::monitor::DriftMonitor;
use heartcare::registry::{ArtifactStore, FileArtifactStore, ModelRegistry};
use heartcare::report::EvaluationReporter;
use heartcare::simulation::{cohort_dataset, heart_rate_stream, heart_schema, CohortProfile};
use std::sync::Arc;

fn provider() -> InMemoryDatasetProvider {
    CohortProfile::all()
        .iter()
        .enumerate()
        .fold(InMemoryDatasetProvider::new(), |p, (i, profile)| {
            p.with_cohort(cohort_dataset(*profile, 200, i as u64 + 1).unwrap())
        })
}

fn evaluation() -> Arc<CohortDataset> {
    let sets: Vec<CohortDataset> = CohortProfile::all()
        .iter()
        .enumerate()
        .map(|(i, p)| cohort_dataset(*p, 80, i as u64 + 50).unwrap())
        .collect();
    Arc::new(CohortDataset::pooled("evaluation", &sets).unwrap())
}

#[tokio::test]
async fn three_rounds_then_drift_swap_and_report() {
    let artifacts = tempfile::tempdir().unwrap();
    let metrics = tempfile::tempdir().unwrap();
    let store = Arc::new(FileArtifactStore::new(artifacts.path()).unwrap());
    let sink = Arc::new(FileMetricsSink::new(metrics.path()).unwrap());

    // Federated rounds.
    let provider = provider();
    let names = provider.cohort_names();
    let trainer = LocalTrainer::new(heart_schema(), TrainerConfig::default(), store.clone());
    let mut aggregator =
        FederatedAggregator::from_provider(trainer, &provider, &names, AggregatorConfig::default()).unwrap();
    let summaries = aggregator.run(3).await.unwrap();

    assert_eq!(summaries.len(), 3);
    assert_eq!(aggregator.rounds_completed(), 3);
    let global = aggregator.latest().unwrap();
    // 4 numerical columns plus the two sex indicators.
    assert_eq!(global.dim(), 6);
    assert_eq!(global.participants, vec!["Typical", "Athletic", "Diver"]);
    for name in &names {
        let model = store.load(name).unwrap().unwrap();
        assert_eq!(model.preprocessor.width(), global.dim());
    }

    // Registry with a pre-swap baseline.
    let registry = Arc::new(ModelRegistry::build(store.as_ref(), &names, evaluation(), sink.clone()).unwrap());
    let before = registry.evaluate_active().await.unwrap();
    assert_eq!(registry.active_name(), "Typical");

    // Stationary readings keep the current model.
    let mut detector = DriftDetector::default();
    let calm = heart_rate_stream(100, 70.0, 2.0, usize::MAX, 0.0, 7);
    assert!(calm.iter().all(|&v| !detector.update(v)));

    // A +20 bpm step triggers the swap.
    let mut monitor = DriftMonitor::new(DriftConfig::default(), registry.clone()).unwrap();
    let stream = heart_rate_stream(100, 70.0, 2.0, 50, 20.0, 7);
    let event = monitor.observe_all(&stream, "Athletic").await.unwrap().unwrap();
    assert!((50..=60).contains(&event.drift.index), "index {}", event.drift.index);
    assert_eq!(event.from, "Typical");
    assert_eq!(registry.active_name(), "Athletic");

    // Both stages are on disk and the report reflects them.
    assert!(metrics.path().join("metrics_centralized.json").exists());
    assert!(metrics.path().join("metrics_post_drift.json").exists());
    assert_eq!(sink.read(Stage::PreSwap).await.unwrap(), Some(before.accuracy));

    let comparison = EvaluationReporter::new(sink).compare().await.unwrap();
    assert_eq!(comparison.before, before.accuracy);
    assert_eq!(comparison.after, event.record.accuracy);
    assert!((comparison.delta - (event.record.accuracy - before.accuracy)).abs() < 1e-12);
    assert!(EvaluationReporter::render_text(&comparison).contains("After drift"));
}

#[tokio::test]
async fn registry_survives_missing_artifact() {
    let artifacts = tempfile::tempdir().unwrap();
    let metrics = tempfile::tempdir().unwrap();
    let store = Arc::new(FileArtifactStore::new(artifacts.path()).unwrap());
    let sink = Arc::new(FileMetricsSink::new(metrics.path()).unwrap());

    let provider = provider();
    let names = provider.cohort_names();
    let trainer = LocalTrainer::new(heart_schema(), TrainerConfig::default(), store.clone());
    let mut aggregator =
        FederatedAggregator::from_provider(trainer, &provider, &names, AggregatorConfig::default()).unwrap();
    aggregator.train_round().await.unwrap();

    std::fs::remove_file(store.path_for("Typical")).unwrap();

    let registry = ModelRegistry::build(store.as_ref(), &names, evaluation(), sink).unwrap();
    assert_eq!(registry.active_name(), "Athletic");
    assert_eq!(registry.cohorts().len(), 2);
    assert!(registry.swap("Typical").await.is_err());
    assert_eq!(registry.active_name(), "Athletic");
}
