//! Model Registry Module
//!
//! Holds the per-cohort models and the single active pointer:
//! - Artifact stores for fitted models
//! - Evaluation-table alignment
//! - Atomic swap with post-swap accuracy evidence

pub mod alignment;
pub mod store;

pub use alignment::{align_for_model, AlignedTable, UNKNOWN_CATEGORY};
pub use store::{ArtifactStore, FileArtifactStore, InMemoryArtifactStore};

use crate::core::{Error, Result};
use crate::data::{CohortDataset, DataTable};
use crate::metrics::{AccuracyRecord, MetricsSink, Stage};
use crate::model::TrainedModel;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Shared handle to a loaded model.
pub type ModelHandle = Arc<TrainedModel>;

/// The pointer readers observe. Replaced as a whole, never edited in place.
#[derive(Debug)]
struct ActiveModel {
    name: String,
    model: ModelHandle,
}

/// Registry of cohort models with one active model.
pub struct ModelRegistry {
    /// Loaded models, fixed after construction
    models: HashMap<String, ModelHandle>,
    /// Loaded cohort names in configured order
    order: Vec<String>,
    /// Active pointer
    active: RwLock<Arc<ActiveModel>>,
    /// Latest accuracy measured for the active model
    cached: RwLock<Option<AccuracyRecord>>,
    /// Held-out evaluation set
    evaluation: Arc<CohortDataset>,
    /// Destination for accuracy evidence
    sink: Arc<dyn MetricsSink>,
    /// Serializes swaps against each other
    swap_lock: tokio::sync::Mutex<()>,
}

impl ModelRegistry {
    /// Load one cohort's model from a store.
    pub fn load(store: &dyn ArtifactStore, cohort: &str) -> Result<ModelHandle> {
        store
            .load(cohort)?
            .map(Arc::new)
            .ok_or_else(|| Error::MissingModel(cohort.to_string()))
    }

    /// Load every available cohort model. Missing artifacts are skipped with
    /// a warning; the first loaded cohort becomes active.
    pub fn build<S: AsRef<str>>(
        store: &dyn ArtifactStore,
        cohorts: &[S],
        evaluation: Arc<CohortDataset>,
        sink: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        let mut models = HashMap::new();
        let mut order = Vec::new();

        for cohort in cohorts {
            let cohort = cohort.as_ref();
            match Self::load(store, cohort) {
                Ok(model) => {
                    info!(cohort, samples = model.samples, "cohort model loaded");
                    models.insert(cohort.to_string(), model);
                    order.push(cohort.to_string());
                }
                Err(Error::MissingModel(name)) => {
                    warn!(cohort = %name, "model artifact not found; continuing without it");
                }
                Err(e) => return Err(e),
            }
        }

        let first = order.first().ok_or(Error::EmptyRegistry)?;
        let active = ActiveModel {
            name: first.clone(),
            model: models[first].clone(),
        };
        info!(active = %active.name, available = order.len(), "model registry ready");

        Ok(Self {
            models,
            order,
            active: RwLock::new(Arc::new(active)),
            cached: RwLock::new(None),
            evaluation,
            sink,
            swap_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Name of the active model.
    pub fn active_name(&self) -> String {
        self.current().name.clone()
    }

    /// Handle to the active model.
    pub fn active_model(&self) -> ModelHandle {
        self.current().model.clone()
    }

    /// Loaded cohort names.
    pub fn cohorts(&self) -> &[String] {
        &self.order
    }

    /// Check if a cohort model is loaded.
    pub fn contains(&self, cohort: &str) -> bool {
        self.models.contains_key(cohort)
    }

    /// Latest accuracy record for the active model.
    pub fn cached_record(&self) -> Option<AccuracyRecord> {
        self.cached.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Predict with the active model.
    pub fn predict(&self, table: &DataTable) -> Result<Vec<u8>> {
        let active = self.current();
        let aligned = align_for_model(table, &active.model.expected_columns(), &active.name)?;
        active.model.predict(&aligned.table)
    }

    /// Evaluate the active model and record it as the pre-swap baseline.
    pub async fn evaluate_active(&self) -> Result<AccuracyRecord> {
        let _guard = self.swap_lock.lock().await;
        let active = self.current();

        let record = self.evaluate(&active.name, active.model.clone(), Stage::PreSwap).await?;
        self.sink.write(Stage::PreSwap, record.accuracy).await?;
        self.store_cached(record.clone());

        info!(cohort = %active.name, accuracy = record.accuracy, "pre-swap accuracy recorded");
        Ok(record)
    }

    /// Make `target` the active model, evaluate it and record the result.
    pub async fn swap(&self, target: &str) -> Result<AccuracyRecord> {
        let _guard = self.swap_lock.lock().await;

        let model = self
            .models
            .get(target)
            .cloned()
            .ok_or_else(|| Error::UnknownCohort(target.to_string()))?;

        let next = Arc::new(ActiveModel {
            name: target.to_string(),
            model: model.clone(),
        });
        // The old record must not outlive the old pointer, even if the
        // evaluation below fails.
        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = None;
        let previous = {
            let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *active, next)
        };

        info!(
            from = %previous.name,
            to = target,
            fingerprint = %model.fingerprint()?.short(),
            "active model swapped"
        );

        let record = self.evaluate(target, model, Stage::PostSwap).await?;
        self.sink.write(Stage::PostSwap, record.accuracy).await?;
        self.store_cached(record.clone());

        info!(
            cohort = target,
            accuracy = record.accuracy,
            defaulted = record.defaulted_columns.len(),
            "post-swap accuracy recorded"
        );
        Ok(record)
    }

    fn current(&self) -> Arc<ActiveModel> {
        self.active.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn store_cached(&self, record: AccuracyRecord) {
        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = Some(record);
    }

    async fn evaluate(&self, cohort: &str, model: ModelHandle, stage: Stage) -> Result<AccuracyRecord> {
        let evaluation = self.evaluation.clone();
        let cohort = cohort.to_string();

        tokio::task::spawn_blocking(move || -> Result<AccuracyRecord> {
            let aligned = align_for_model(&evaluation.features, &model.expected_columns(), &cohort)?;
            let accuracy = model.accuracy(&aligned.table, &evaluation.labels)?;
            Ok(AccuracyRecord::new(stage, accuracy)
                .with_cohort(&cohort)
                .with_defaulted_columns(aligned.defaulted))
        })
        .await?
    }
}
