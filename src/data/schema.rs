//! Declared feature schemas.

use crate::core::{Error, Result};
use crate::data::table::{ColumnKind, DataTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Partition of feature columns into numerical and categorical sets.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Numerical feature columns
    pub numerical: Vec<String>,
    /// Categorical feature columns
    pub categorical: Vec<String>,
    /// Fixed one-hot vocabularies. Columns without an entry learn theirs
    /// from the training data.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
}

impl FeatureSchema {
    /// Create a schema from column names.
    pub fn new<S: AsRef<str>>(numerical: &[S], categorical: &[S]) -> Self {
        Self {
            numerical: numerical.iter().map(|s| s.as_ref().to_string()).collect(),
            categorical: categorical.iter().map(|s| s.as_ref().to_string()).collect(),
            categories: BTreeMap::new(),
        }
    }

    /// Pin the vocabulary of a categorical column.
    pub fn with_categories<S: AsRef<str>>(mut self, column: &str, categories: &[S]) -> Self {
        self.categories.insert(
            column.to_string(),
            categories.iter().map(|s| s.as_ref().to_string()).collect(),
        );
        self
    }

    /// Infer the partition from column kinds.
    pub fn infer(table: &DataTable) -> Self {
        let mut schema = Self::default();
        for column in table.columns() {
            match column.kind() {
                ColumnKind::Numerical => schema.numerical.push(column.name.clone()),
                ColumnKind::Categorical => schema.categorical.push(column.name.clone()),
            }
        }
        schema
    }

    /// Total declared columns.
    pub fn len(&self) -> usize {
        self.numerical.len() + self.categorical.len()
    }

    /// Check if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify that the declared sets partition exactly the table's columns
    /// and that every column has the declared kind.
    pub fn validate(&self, table: &DataTable) -> Result<()> {
        let numerical: HashSet<&str> = self.numerical.iter().map(String::as_str).collect();
        let categorical: HashSet<&str> = self.categorical.iter().map(String::as_str).collect();

        if let Some(both) = numerical.intersection(&categorical).next() {
            return Err(Error::Schema(format!(
                "column '{}' declared both numerical and categorical",
                both
            )));
        }

        for column in table.columns() {
            let declared = if numerical.contains(column.name.as_str()) {
                ColumnKind::Numerical
            } else if categorical.contains(column.name.as_str()) {
                ColumnKind::Categorical
            } else {
                return Err(Error::Schema(format!(
                    "column '{}' is not declared in the feature schema",
                    column.name
                )));
            };

            if declared != column.kind() {
                return Err(Error::Schema(format!(
                    "column '{}' declared {} but holds {} values",
                    column.name,
                    declared,
                    column.kind()
                )));
            }
        }

        for name in numerical.iter().chain(categorical.iter()) {
            if !table.has_column(name) {
                return Err(Error::Schema(format!("declared column '{}' is missing", name)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Column;

    fn table() -> DataTable {
        DataTable::new(vec![
            Column::numeric("age", vec![50.0]),
            Column::categorical("sex", vec!["Male"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_infer() {
        let schema = FeatureSchema::infer(&table());
        assert_eq!(schema.numerical, vec!["age"]);
        assert_eq!(schema.categorical, vec!["sex"]);
        assert!(schema.validate(&table()).is_ok());
    }

    #[test]
    fn test_undeclared_column() {
        let schema = FeatureSchema::new(&["age"], &[]);
        assert!(matches!(schema.validate(&table()), Err(Error::Schema(_))));
    }

    #[test]
    fn test_missing_declared_column() {
        let schema = FeatureSchema::new(&["age", "chol"], &["sex"]);
        assert!(schema.validate(&table()).is_err());
    }

    #[test]
    fn test_overlapping_declaration() {
        let schema = FeatureSchema::new(&["age", "sex"], &["sex"]);
        assert!(schema.validate(&table()).is_err());
    }

    #[test]
    fn test_kind_mismatch() {
        let schema = FeatureSchema::new(&["sex"], &["age"]);
        let err = schema.validate(&table()).unwrap_err();
        assert!(err.to_string().contains("declared"));
    }
}
