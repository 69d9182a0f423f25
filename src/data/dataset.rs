//! Cohort datasets and the provider seam.

use crate::core::{Error, Result};
use crate::data::table::{ColumnValues, DataTable};
use std::collections::HashMap;
use std::sync::Arc;

/// Features and binary labels for one cohort.
#[derive(Clone, Debug, PartialEq)]
pub struct CohortDataset {
    /// Cohort name
    pub name: String,
    /// Feature columns (target removed)
    pub features: DataTable,
    /// Binary labels
    pub labels: Vec<u8>,
}

impl CohortDataset {
    /// Create from already split features and labels.
    pub fn new(name: &str, features: DataTable, labels: Vec<u8>) -> Result<Self> {
        if features.rows() != labels.len() && !features.columns().is_empty() {
            return Err(Error::Schema(format!(
                "cohort {} has {} feature rows but {} labels",
                name,
                features.rows(),
                labels.len()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            features,
            labels,
        })
    }

    /// Split a raw table into features and `target > 0` labels.
    pub fn from_table(name: &str, mut table: DataTable, target: &str) -> Result<Self> {
        let column = table
            .take_column(target)
            .ok_or_else(|| Error::Schema(format!("cohort {} has no target column '{}'", name, target)))?;

        let ColumnValues::Numeric(values) = column.values else {
            return Err(Error::Schema(format!(
                "target column '{}' of cohort {} is not numeric",
                target, name
            )));
        };

        let labels = values
            .iter()
            .enumerate()
            .map(|(row, v)| match v {
                Some(v) => Ok(u8::from(*v > 0.0)),
                None => Err(Error::Schema(format!(
                    "cohort {} is missing the target at row {}",
                    name, row
                ))),
            })
            .collect::<Result<Vec<u8>>>()?;

        Self::new(name, table, labels)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if the cohort has no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of distinct label classes present.
    pub fn class_count(&self) -> usize {
        let positives = self.labels.iter().filter(|&&l| l == 1).count();
        usize::from(positives > 0) + usize::from(positives < self.labels.len())
    }

    /// Fraction of positive labels.
    pub fn positive_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.iter().filter(|&&l| l == 1).count() as f64 / self.labels.len() as f64
    }

    /// Concatenate cohorts into one evaluation set.
    pub fn pooled(name: &str, cohorts: &[CohortDataset]) -> Result<Self> {
        let tables: Vec<DataTable> = cohorts.iter().map(|c| c.features.clone()).collect();
        let features = DataTable::concat(&tables)?;
        let labels = cohorts.iter().flat_map(|c| c.labels.iter().copied()).collect();
        Self::new(name, features, labels)
    }
}

/// Source of schema-normalized cohort data.
pub trait DatasetProvider: Send + Sync {
    /// Cohort names in configured order.
    fn cohort_names(&self) -> Vec<String>;

    /// Fetch one cohort's dataset.
    fn cohort(&self, name: &str) -> Option<Arc<CohortDataset>>;
}

/// Provider over datasets held in memory.
#[derive(Default)]
pub struct InMemoryDatasetProvider {
    order: Vec<String>,
    cohorts: HashMap<String, Arc<CohortDataset>>,
}

impl InMemoryDatasetProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cohort, keeping insertion order.
    pub fn with_cohort(mut self, dataset: CohortDataset) -> Self {
        if !self.cohorts.contains_key(&dataset.name) {
            self.order.push(dataset.name.clone());
        }
        self.cohorts.insert(dataset.name.clone(), Arc::new(dataset));
        self
    }
}

impl DatasetProvider for InMemoryDatasetProvider {
    fn cohort_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn cohort(&self, name: &str) -> Option<Arc<CohortDataset>> {
        self.cohorts.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Column;

    fn raw() -> DataTable {
        DataTable::new(vec![
            Column::numeric("age", vec![40.0, 50.0, 60.0]),
            Column::numeric("num", vec![0.0, 2.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_table_derives_labels() {
        let ds = CohortDataset::from_table("Typical", raw(), "num").unwrap();
        assert_eq!(ds.labels, vec![0, 1, 1]);
        assert!(!ds.features.has_column("num"));
        assert_eq!(ds.class_count(), 2);
        assert!((ds.positive_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_target() {
        let result = CohortDataset::from_table("Typical", raw(), "target");
        assert!(matches!(result, Err(Error::Schema(_))));
    }

    #[test]
    fn test_categorical_target_rejected() {
        let table = DataTable::new(vec![Column::categorical("num", vec!["a"])]).unwrap();
        assert!(CohortDataset::from_table("Typical", table, "num").is_err());
    }

    #[test]
    fn test_single_class() {
        let table = DataTable::new(vec![
            Column::numeric("age", vec![1.0, 2.0]),
            Column::numeric("num", vec![0.0, 0.0]),
        ])
        .unwrap();
        let ds = CohortDataset::from_table("Diver", table, "num").unwrap();
        assert_eq!(ds.class_count(), 1);
    }

    #[test]
    fn test_provider_order() {
        let a = CohortDataset::from_table("Typical", raw(), "num").unwrap();
        let b = CohortDataset::from_table("Athletic", raw(), "num").unwrap();
        let provider = InMemoryDatasetProvider::new().with_cohort(a).with_cohort(b);

        assert_eq!(provider.cohort_names(), vec!["Typical", "Athletic"]);
        assert_eq!(provider.cohort("Athletic").unwrap().len(), 3);
        assert!(provider.cohort("Diver").is_none());
    }

    #[test]
    fn test_pooled() {
        let a = CohortDataset::from_table("Typical", raw(), "num").unwrap();
        let b = CohortDataset::from_table("Athletic", raw(), "num").unwrap();
        let pooled = CohortDataset::pooled("eval", &[a, b]).unwrap();
        assert_eq!(pooled.len(), 6);
        assert_eq!(pooled.features.rows(), 6);
    }
}
