//! Column-oriented feature tables.
//!
//! Cells are optional; `None` marks a missing value that the preprocessing
//! pipeline imputes.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Kind of a feature column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Numeric column
    Numerical,
    /// String-valued column
    Categorical,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Numerical => write!(f, "numerical"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Values held by a column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnValues {
    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    /// Check if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column kind.
    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValues::Numeric(_) => ColumnKind::Numerical,
            ColumnValues::Categorical(_) => ColumnKind::Categorical,
        }
    }
}

/// A named column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Cell values
    pub values: ColumnValues,
}

impl Column {
    /// Numeric column with no missing cells.
    pub fn numeric(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            values: ColumnValues::Numeric(values.into_iter().map(Some).collect()),
        }
    }

    /// Categorical column with no missing cells.
    pub fn categorical<S: Into<String>>(name: &str, values: Vec<S>) -> Self {
        Self {
            name: name.to_string(),
            values: ColumnValues::Categorical(values.into_iter().map(|v| Some(v.into())).collect()),
        }
    }

    /// Column from optional values.
    pub fn with_values(name: &str, values: ColumnValues) -> Self {
        Self {
            name: name.to_string(),
            values,
        }
    }

    /// Column kind.
    pub fn kind(&self) -> ColumnKind {
        self.values.kind()
    }
}

/// A rectangular table of named columns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    columns: Vec<Column>,
}

impl DataTable {
    /// Build a table, rejecting ragged or duplicate columns.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(Error::Schema(format!("duplicate column '{}'", column.name)));
            }
        }

        if let Some(first) = columns.first() {
            let rows = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != rows) {
                return Err(Error::Schema(format!(
                    "column '{}' has {} rows, expected {}",
                    bad.name,
                    bad.values.len(),
                    rows
                )));
            }
        }

        Ok(Self { columns })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// All columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Append a column.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(Error::Schema(format!("duplicate column '{}'", column.name)));
        }
        if !self.columns.is_empty() && column.values.len() != self.rows() {
            return Err(Error::Schema(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.values.len(),
                self.rows()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove and return a column.
    pub fn take_column(&mut self, name: &str) -> Option<Column> {
        let pos = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(pos))
    }

    /// Concatenate tables with identical schemas row-wise.
    pub fn concat(tables: &[DataTable]) -> Result<Self> {
        let Some(first) = tables.first() else {
            return Ok(Self::default());
        };

        let mut columns = first.columns.clone();
        for table in &tables[1..] {
            if table.column_names() != first.column_names() {
                return Err(Error::Schema(format!(
                    "cannot concatenate tables with columns {:?} and {:?}",
                    first.column_names(),
                    table.column_names()
                )));
            }
            for (dst, src) in columns.iter_mut().zip(table.columns.iter()) {
                match (&mut dst.values, &src.values) {
                    (ColumnValues::Numeric(d), ColumnValues::Numeric(s)) => d.extend_from_slice(s),
                    (ColumnValues::Categorical(d), ColumnValues::Categorical(s)) => {
                        d.extend_from_slice(s)
                    }
                    _ => {
                        return Err(Error::Schema(format!(
                            "column '{}' changes kind between tables",
                            src.name
                        )))
                    }
                }
            }
        }

        Self::new(columns)
    }
}

/// Strip and lowercase column names.
pub fn normalize_column_names(mut table: DataTable) -> Result<DataTable> {
    for column in &mut table.columns {
        column.name = column.name.trim().to_lowercase();
    }
    DataTable::new(table.columns)
}
