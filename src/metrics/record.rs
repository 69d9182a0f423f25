//! Accuracy records.

use crate::core::{now, Timestamp};
use serde::{Deserialize, Serialize};

/// When an accuracy was measured relative to a swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Baseline before drift handling
    PreSwap,
    /// After the drift-triggered swap
    PostSwap,
}

impl Stage {
    /// Storage key used by metrics sinks.
    pub fn key(&self) -> &'static str {
        match self {
            Stage::PreSwap => "centralized",
            Stage::PostSwap => "post-drift",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::PreSwap => write!(f, "pre-swap"),
            Stage::PostSwap => write!(f, "post-swap"),
        }
    }
}

/// One accuracy measurement. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    /// Fraction of exact label matches
    pub accuracy: f64,
    /// Measurement stage
    pub stage: Stage,
    /// Cohort model that was evaluated
    pub cohort: Option<String>,
    /// Evaluation columns filled with defaults because the table lacked them
    pub defaulted_columns: Vec<String>,
    /// Measurement time
    pub recorded_at: Timestamp,
}

impl AccuracyRecord {
    /// Create a record.
    pub fn new(stage: Stage, accuracy: f64) -> Self {
        Self {
            accuracy,
            stage,
            cohort: None,
            defaulted_columns: Vec::new(),
            recorded_at: now(),
        }
    }

    /// Attach the evaluated cohort.
    pub fn with_cohort(mut self, cohort: &str) -> Self {
        self.cohort = Some(cohort.to_string());
        self
    }

    /// Attach defaulted evaluation columns.
    pub fn with_defaulted_columns(mut self, columns: Vec<String>) -> Self {
        self.defaulted_columns = columns;
        self
    }

    /// Check if the evaluation table had to be patched.
    pub fn has_schema_fallback(&self) -> bool {
        !self.defaulted_columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_keys() {
        assert_eq!(Stage::PreSwap.key(), "centralized");
        assert_eq!(Stage::PostSwap.key(), "post-drift");
        assert_eq!(Stage::PostSwap.to_string(), "post-swap");
    }

    #[test]
    fn test_record_builder() {
        let record = AccuracyRecord::new(Stage::PostSwap, 0.84)
            .with_cohort("Athletic")
            .with_defaulted_columns(vec!["user_type".into()]);
        assert_eq!(record.cohort.as_deref(), Some("Athletic"));
        assert!(record.has_schema_fallback());
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&Stage::PreSwap).unwrap();
        assert_eq!(json, "\"pre-swap\"");
    }
}
