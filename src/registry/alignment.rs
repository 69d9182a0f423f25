//! Evaluation-table alignment.
//!
//! A held-out table may lack a column that a cohort model was trained with
//! (for example a cohort-identity feature). Such columns are filled with a
//! fixed default so evaluation can proceed: categorical columns get
//! [`UNKNOWN_CATEGORY`], which one-hot encodes to all zeros, and numerical
//! columns get missing cells, which impute to the training median.
//!
//! This can distort accuracy for models that relied on the column. Every
//! fill is logged and reported back to the caller.

use crate::core::Result;
use crate::data::{Column, ColumnKind, ColumnValues, DataTable};
use std::borrow::Cow;
use tracing::warn;

/// Placeholder written into missing categorical columns.
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Table ready for a model plus the columns that were defaulted.
#[derive(Debug)]
pub struct AlignedTable<'a> {
    /// Table with every expected column present
    pub table: Cow<'a, DataTable>,
    /// Columns that were filled with defaults
    pub defaulted: Vec<String>,
}

/// Add default-valued columns for everything in `expected` that `table` lacks.
pub fn align_for_model<'a>(
    table: &'a DataTable,
    expected: &[(String, ColumnKind)],
    cohort: &str,
) -> Result<AlignedTable<'a>> {
    let missing: Vec<&(String, ColumnKind)> = expected
        .iter()
        .filter(|(name, _)| !table.has_column(name))
        .collect();

    if missing.is_empty() {
        return Ok(AlignedTable {
            table: Cow::Borrowed(table),
            defaulted: Vec::new(),
        });
    }

    let rows = table.rows();
    let mut patched = table.clone();
    let mut defaulted = Vec::with_capacity(missing.len());
    for (name, kind) in missing {
        let values = match kind {
            ColumnKind::Categorical => {
                ColumnValues::Categorical(vec![Some(UNKNOWN_CATEGORY.to_string()); rows])
            }
            ColumnKind::Numerical => ColumnValues::Numeric(vec![None; rows]),
        };
        warn!(
            cohort,
            column = %name,
            kind = %kind,
            "evaluation table lacks a model column; filled with default, accuracy may be distorted"
        );
        patched.push_column(Column::with_values(name, values))?;
        defaulted.push(name.clone());
    }

    Ok(AlignedTable {
        table: Cow::Owned(patched),
        defaulted,
    })
}
