//! End-to-end lifecycle run on simulated cohorts.
//!
//! Usage: `heartcare [config.json]`

use heartcare::config::LifecycleConfig;
use heartcare::data::{normalize_column_names, CohortDataset, FeatureSchema, InMemoryDatasetProvider};
use heartcare::federated::{FederatedAggregator, LocalTrainer};
use heartcare::metrics::FileMetricsSink;
use heartcare::monitor::DriftMonitor;
use heartcare::registry::{FileArtifactStore, ModelRegistry};
use heartcare::report::EvaluationReporter;
use heartcare::simulation::{cohort_table, heart_rate_stream, CohortProfile};
use heartcare::{Error, Result};
use std::sync::Arc;
use tracing::info;

const TRAIN_ROWS: usize = 300;
const EVAL_ROWS: usize = 100;
const STREAM_SEED: u64 = 42;

fn load_cohort(name: &str, rows: usize, seed: u64, target: &str) -> Result<CohortDataset> {
    let profile: CohortProfile = name.parse()?;
    let table = normalize_column_names(cohort_table(profile, rows, seed)?)?;
    CohortDataset::from_table(profile.name(), table, target)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => LifecycleConfig::from_json_file(path)?,
        None => LifecycleConfig::default(),
    };
    config.validate()?;
    config.logging.init()?;

    let mut provider = InMemoryDatasetProvider::new();
    let mut held_out = Vec::with_capacity(config.cohorts.len());
    for (i, name) in config.cohorts.iter().enumerate() {
        provider = provider.with_cohort(load_cohort(name, TRAIN_ROWS, i as u64 + 1, &config.target)?);
        held_out.push(load_cohort(name, EVAL_ROWS, i as u64 + 101, &config.target)?);
    }
    let evaluation = Arc::new(CohortDataset::pooled("evaluation", &held_out)?);

    let schema = match &config.schema {
        Some(schema) => schema.clone(),
        None => FeatureSchema::infer(&held_out[0].features),
    };
    info!(numerical = ?schema.numerical, categorical = ?schema.categorical, "feature schema");

    let store = Arc::new(FileArtifactStore::new(&config.storage.artifact_dir)?);
    let sink = Arc::new(FileMetricsSink::new(&config.storage.metrics_dir)?);

    let trainer = LocalTrainer::new(schema, config.trainer.clone(), store.clone());
    let mut aggregator =
        FederatedAggregator::from_provider(trainer, &provider, &config.cohorts, config.aggregator.clone())?;
    aggregator.run_configured().await?;
    if let Some(global) = aggregator.latest() {
        println!(
            "Global estimate after {} rounds: dim={} bias={:.4}",
            aggregator.rounds_completed(),
            global.dim(),
            global.bias
        );
    }

    let registry = Arc::new(ModelRegistry::build(
        store.as_ref(),
        &config.cohorts,
        evaluation,
        sink.clone(),
    )?);
    registry.evaluate_active().await?;

    let target = registry
        .cohorts()
        .iter()
        .find(|c| **c != registry.active_name())
        .cloned()
        .ok_or_else(|| Error::Config("a swap needs at least two cohort models".into()))?;

    let mut monitor = DriftMonitor::new(config.drift.clone(), registry.clone())?;
    let stream = heart_rate_stream(100, 70.0, 2.0, 50, 20.0, STREAM_SEED);
    match monitor.observe_all(&stream, &target).await? {
        Some(event) => println!(
            "Drift at reading {}: swapped {} -> {} (accuracy {:.3})",
            event.drift.index, event.from, event.to, event.record.accuracy
        ),
        None => println!("No drift detected; {} stays active", registry.active_name()),
    }

    let reporter = EvaluationReporter::new(sink);
    match reporter.compare().await {
        Ok(comparison) => print!("{}", EvaluationReporter::render_text(&comparison)),
        Err(Error::MissingRecord(stage)) => println!("No {} record; nothing to compare", stage),
        Err(e) => return Err(e),
    }

    Ok(())
}
