//! Evaluation Reporting Module
//!
//! Compares the persisted pre-swap and post-swap accuracies.

pub mod reporter;

pub use reporter::{Comparison, EvaluationReporter};
