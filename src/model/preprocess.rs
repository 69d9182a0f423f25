//! Column preprocessing.
//!
//! Numerical columns: median imputation, then optional standard scaling.
//! Categorical columns: most-frequent imputation, then one-hot encoding with
//! unknown categories mapped to an all-zero block.

use crate::core::{Error, Result};
use crate::data::{ColumnKind, ColumnValues, DataTable, FeatureSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fitted transform for one numerical column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericStep {
    /// Source column
    pub column: String,
    /// Imputation value
    pub median: f64,
    /// Mean and standard deviation when scaling is enabled
    pub scaling: Option<(f64, f64)>,
}

impl NumericStep {
    fn fit(column: &str, values: &[Option<f64>], scale: bool) -> Self {
        let median = median(values);
        let scaling = scale.then(|| {
            let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();
            let n = imputed.len().max(1) as f64;
            let mean = imputed.iter().sum::<f64>() / n;
            let var = imputed.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            (mean, if std > 0.0 { std } else { 1.0 })
        });

        Self {
            column: column.to_string(),
            median,
            scaling,
        }
    }

    fn apply(&self, value: Option<f64>) -> f64 {
        let v = value.unwrap_or(self.median);
        match self.scaling {
            Some((mean, std)) => (v - mean) / std,
            None => v,
        }
    }
}

/// Fitted transform for one categorical column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoricalStep {
    /// Source column
    pub column: String,
    /// Imputation value
    pub most_frequent: String,
    /// One-hot vocabulary, in output order
    pub categories: Vec<String>,
}

impl CategoricalStep {
    fn fit(column: &str, values: &[Option<String>], fixed: Option<&Vec<String>>) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for v in values.iter().flatten() {
            *counts.entry(v.as_str()).or_insert(0) += 1;
        }

        // Ties resolve to the lexicographically smallest category.
        let most_frequent = counts
            .iter()
            .fold(None::<(&str, usize)>, |best, (&cat, &n)| match best {
                Some((_, m)) if m >= n => best,
                _ => Some((cat, n)),
            })
            .map(|(cat, _)| cat.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let categories = match fixed {
            Some(vocab) => vocab.clone(),
            None => counts.keys().map(|c| c.to_string()).collect(),
        };

        Self {
            column: column.to_string(),
            most_frequent,
            categories,
        }
    }

    fn apply(&self, value: Option<&String>, out: &mut Vec<f64>) {
        let v = value.map(String::as_str).unwrap_or(self.most_frequent.as_str());
        out.extend(self.categories.iter().map(|c| if c == v { 1.0 } else { 0.0 }));
    }
}

/// Fitted column transformer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    numeric: Vec<NumericStep>,
    categorical: Vec<CategoricalStep>,
}

impl Preprocessor {
    /// Fit all steps on a training table.
    pub fn fit(table: &DataTable, schema: &FeatureSchema, scale_numeric: bool) -> Result<Self> {
        schema.validate(table)?;

        let mut numeric = Vec::with_capacity(schema.numerical.len());
        for name in &schema.numerical {
            let values = numeric_values(table, name)?;
            numeric.push(NumericStep::fit(name, values, scale_numeric));
        }

        let mut categorical = Vec::with_capacity(schema.categorical.len());
        for name in &schema.categorical {
            let values = categorical_values(table, name)?;
            categorical.push(CategoricalStep::fit(name, values, schema.categories.get(name)));
        }

        Ok(Self {
            numeric,
            categorical,
        })
    }

    /// Encoded feature width.
    pub fn width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Encoded feature names, e.g. `age` or `sex=Male`.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|n| n.column.clone()).collect();
        for step in &self.categorical {
            names.extend(step.categories.iter().map(|c| format!("{}={}", step.column, c)));
        }
        names
    }

    /// Source columns the transform reads.
    pub fn expected_columns(&self) -> Vec<(String, ColumnKind)> {
        self.numeric
            .iter()
            .map(|n| (n.column.clone(), ColumnKind::Numerical))
            .chain(
                self.categorical
                    .iter()
                    .map(|c| (c.column.clone(), ColumnKind::Categorical)),
            )
            .collect()
    }

    /// Encode a table into dense rows. Extra columns are ignored.
    pub fn transform(&self, table: &DataTable) -> Result<Vec<Vec<f64>>> {
        let numeric: Vec<&[Option<f64>]> = self
            .numeric
            .iter()
            .map(|step| numeric_values(table, &step.column))
            .collect::<Result<_>>()?;
        let categorical: Vec<&[Option<String>]> = self
            .categorical
            .iter()
            .map(|step| categorical_values(table, &step.column))
            .collect::<Result<_>>()?;

        let width = self.width();
        let rows = (0..table.rows())
            .map(|row| {
                let mut encoded = Vec::with_capacity(width);
                for (step, values) in self.numeric.iter().zip(&numeric) {
                    encoded.push(step.apply(values[row]));
                }
                for (step, values) in self.categorical.iter().zip(&categorical) {
                    step.apply(values[row].as_ref(), &mut encoded);
                }
                encoded
            })
            .collect();

        Ok(rows)
    }
}

fn numeric_values<'a>(table: &'a DataTable, name: &str) -> Result<&'a [Option<f64>]> {
    match table.column(name).map(|c| &c.values) {
        Some(ColumnValues::Numeric(v)) => Ok(v),
        Some(_) => Err(Error::Schema(format!("column '{}' is not numerical", name))),
        None => Err(Error::Schema(format!("column '{}' is missing", name))),
    }
}

fn categorical_values<'a>(table: &'a DataTable, name: &str) -> Result<&'a [Option<String>]> {
    match table.column(name).map(|c| &c.values) {
        Some(ColumnValues::Categorical(v)) => Ok(v),
        Some(_) => Err(Error::Schema(format!("column '{}' is not categorical", name))),
        None => Err(Error::Schema(format!("column '{}' is missing", name))),
    }
}

fn median(values: &[Option<f64>]) -> f64 {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return 0.0;
    }
    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    }
}
