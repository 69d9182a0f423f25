//! Model Module
//!
//! Per-cohort estimators:
//! - Column preprocessing (imputation, scaling, one-hot)
//! - L2-regularized logistic regression
//! - `TrainedModel` binding both to a cohort

pub mod logistic;
pub mod preprocess;

pub use logistic::LogisticRegression;
pub use preprocess::Preprocessor;

use crate::config::TrainerConfig;
use crate::core::{now, Error, Fingerprint, Result, Timestamp};
use crate::data::{CohortDataset, ColumnKind, DataTable, FeatureSchema};
use serde::{Deserialize, Serialize};

/// A fitted pipeline owned by one cohort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    /// Cohort the model was trained for
    pub cohort: String,
    /// Fitted preprocessing
    pub preprocessor: Preprocessor,
    /// Fitted classifier
    pub classifier: LogisticRegression,
    /// Training sample count
    pub samples: usize,
    /// Training time
    pub trained_at: Timestamp,
}

impl TrainedModel {
    /// Fit preprocessing and classifier on a cohort.
    pub fn fit(dataset: &CohortDataset, schema: &FeatureSchema, config: &TrainerConfig) -> Result<Self> {
        let preprocessor = Preprocessor::fit(&dataset.features, schema, config.scale_numeric)
            .map_err(|e| match e {
                Error::Schema(msg) => Error::Schema(format!("cohort {}: {}", dataset.name, msg)),
                other => other,
            })?;

        let classes = dataset.class_count();
        if classes < 2 {
            return Err(Error::InsufficientData {
                cohort: dataset.name.clone(),
                classes,
            });
        }

        let x = preprocessor.transform(&dataset.features)?;
        let classifier = LogisticRegression::fit(&x, &dataset.labels, config);

        Ok(Self {
            cohort: dataset.name.clone(),
            preprocessor,
            classifier,
            samples: dataset.len(),
            trained_at: now(),
        })
    }

    /// Predict labels for every row.
    pub fn predict(&self, table: &DataTable) -> Result<Vec<u8>> {
        let rows = self.preprocessor.transform(table)?;
        Ok(rows.iter().map(|r| self.classifier.predict(r)).collect())
    }

    /// Fraction of rows whose prediction matches the label.
    pub fn accuracy(&self, table: &DataTable, labels: &[u8]) -> Result<f64> {
        if table.rows() != labels.len() {
            return Err(Error::Schema(format!(
                "evaluation table has {} rows but {} labels",
                table.rows(),
                labels.len()
            )));
        }
        if labels.is_empty() {
            return Err(Error::Schema("evaluation table is empty".to_string()));
        }

        let predicted = self.predict(table)?;
        let hits = predicted.iter().zip(labels).filter(|(p, l)| p == l).count();
        Ok(hits as f64 / labels.len() as f64)
    }

    /// Weight vector.
    pub fn weights(&self) -> &[f64] {
        &self.classifier.weights
    }

    /// Intercept.
    pub fn bias(&self) -> f64 {
        self.classifier.bias
    }

    /// Source columns the model reads.
    pub fn expected_columns(&self) -> Vec<(String, ColumnKind)> {
        self.preprocessor.expected_columns()
    }

    /// SHA3-256 of the serialized pipeline parameters.
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        let bytes = bincode::serialize(&(&self.preprocessor, &self.classifier))?;
        Ok(Fingerprint::of(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, DataTable};

    fn cohort(labels: Vec<u8>) -> CohortDataset {
        let n = labels.len();
        let age: Vec<f64> = labels.iter().map(|&l| if l == 1 { 65.0 } else { 40.0 }).collect();
        let sex: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "Male" } else { "Female" }).collect();
        let features = DataTable::new(vec![Column::numeric("age", age), Column::categorical("sex", sex)]).unwrap();
        CohortDataset::new("Typical", features, labels).unwrap()
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(&["age"], &["sex"])
    }

    #[test]
    fn test_fit_and_accuracy() {
        let data = cohort(vec![0, 1, 1, 0, 0, 1, 1, 0]);
        let model = TrainedModel::fit(&data, &schema(), &TrainerConfig::default()).unwrap();
        assert_eq!(model.weights().len(), 3);
        let acc = model.accuracy(&data.features, &data.labels).unwrap();
        assert!((acc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_is_insufficient() {
        let data = cohort(vec![1, 1, 1]);
        let err = TrainedModel::fit(&data, &schema(), &TrainerConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { classes: 1, .. }));
    }

    #[test]
    fn test_schema_error_names_cohort() {
        let data = cohort(vec![0, 1]);
        let bad = FeatureSchema::new(&["age"], &[]);
        let err = TrainedModel::fit(&data, &bad, &TrainerConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Typical"));
    }

    #[test]
    fn test_fingerprint_changes_with_parameters() {
        let data = cohort(vec![0, 1, 0, 1]);
        let model = TrainedModel::fit(&data, &schema(), &TrainerConfig::default()).unwrap();
        let mut other = model.clone();
        other.classifier.bias += 1.0;
        assert_ne!(model.fingerprint().unwrap(), other.fingerprint().unwrap());
    }
}
