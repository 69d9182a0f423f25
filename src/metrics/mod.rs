//! Metrics Module
//!
//! Accuracy evidence around a model swap:
//! - Stage vocabulary and accuracy records
//! - `MetricsSink` backends (files, memory)

pub mod record;
pub mod sink;

pub use record::{AccuracyRecord, Stage};
pub use sink::{FileMetricsSink, InMemoryMetricsSink, MetricsSink};
