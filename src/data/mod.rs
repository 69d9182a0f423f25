//! Data Module
//!
//! Tabular inputs handed to the lifecycle by the dataset provider:
//! - Column-oriented feature tables with missing cells
//! - Declared numerical/categorical feature schemas
//! - Cohort datasets with `target > 0` labels

pub mod dataset;
pub mod schema;
pub mod table;

pub use dataset::{CohortDataset, DatasetProvider, InMemoryDatasetProvider};
pub use schema::FeatureSchema;
pub use table::{normalize_column_names, Column, ColumnKind, ColumnValues, DataTable};
