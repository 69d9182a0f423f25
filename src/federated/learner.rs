//! Local trainer for per-cohort models.
//!
//! Fits a model on one cohort's data, persists it under the cohort's name and
//! hands back only the classifier parameters. Raw rows never leave this step.

use crate::config::TrainerConfig;
use crate::core::{Fingerprint, Result};
use crate::data::{CohortDataset, FeatureSchema};
use crate::model::TrainedModel;
use crate::registry::ArtifactStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Parameters contributed by one cohort for one round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalUpdate {
    /// Cohort name
    pub cohort: String,
    /// Classifier weights
    pub weights: Vec<f64>,
    /// Classifier intercept
    pub bias: f64,
    /// Samples trained on
    pub samples: usize,
    /// Fingerprint of the persisted model
    pub fingerprint: Fingerprint,
}

impl LocalUpdate {
    /// Encoded feature width.
    pub fn dim(&self) -> usize {
        self.weights.len()
    }
}

/// Trainer shared by every cohort task.
#[derive(Clone)]
pub struct LocalTrainer {
    schema: Arc<FeatureSchema>,
    config: TrainerConfig,
    store: Arc<dyn ArtifactStore>,
}

impl LocalTrainer {
    /// Create a trainer writing into `store`.
    pub fn new(schema: FeatureSchema, config: TrainerConfig, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            schema: Arc::new(schema),
            config,
            store,
        }
    }

    /// Declared feature schema.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Fit, persist and return the cohort's parameters.
    pub fn train(&self, dataset: &CohortDataset) -> Result<LocalUpdate> {
        let model = TrainedModel::fit(dataset, &self.schema, &self.config)?;
        let fingerprint = model.fingerprint()?;

        debug!(
            cohort = %dataset.name,
            iterations = model.classifier.iterations,
            width = model.weights().len(),
            "local model fitted"
        );

        self.store.save(&dataset.name, &model)?;
        info!(
            cohort = %dataset.name,
            samples = model.samples,
            fingerprint = %fingerprint.short(),
            "cohort model saved"
        );

        Ok(LocalUpdate {
            cohort: dataset.name.clone(),
            weights: model.classifier.weights,
            bias: model.classifier.bias,
            samples: model.samples,
            fingerprint,
        })
    }
}
