//! Error types for HeartCare.

use crate::metrics::Stage;
use thiserror::Error;

/// Result type alias for HeartCare operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur across the model lifecycle.
#[derive(Error, Debug)]
pub enum Error {
    // Data errors
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Insufficient data for cohort {cohort}: found {classes} label class(es), need 2")]
    InsufficientData { cohort: String, classes: usize },

    // Aggregation errors
    #[error("Dimension mismatch for cohort {cohort}: expected {expected}, got {found}")]
    DimensionMismatch {
        cohort: String,
        expected: usize,
        found: usize,
    },

    #[error("Round {0} produced no cohort updates")]
    EmptyRound(u32),

    // Registry errors
    #[error("Model artifact not found for cohort {0}")]
    MissingModel(String),

    #[error("No model loaded for cohort {0}")]
    UnknownCohort(String),

    #[error("Registry has no available cohort models")]
    EmptyRegistry,

    // Reporting errors
    #[error("Accuracy record missing for stage {0}")]
    MissingRecord(Stage),

    // Drift errors
    #[error("Invalid observation: {0}")]
    InvalidObservation(f64),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error only disqualifies one cohort from a training round.
    pub fn is_cohort_local(&self) -> bool {
        matches!(self, Error::Schema(_) | Error::InsufficientData { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("blocking task failed: {}", err))
    }
}
