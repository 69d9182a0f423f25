//! # HeartCare - Drift-Aware Cohort Model Lifecycle
//!
//! Per-cohort heart-disease predictors kept current under drift:
//! - **federated**: per-cohort training rounds with a FedAvg estimate
//! - **drift**: adaptive-window change detection on a vital-sign stream
//! - **registry**: cohort model registry with atomic hot swap
//! - **report**: before/after accuracy comparison
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use heartcare::drift::DriftDetector;
//!
//! let mut detector = DriftDetector::default();
//! for bpm in [70.0, 71.2, 69.8, 92.5] {
//!     if detector.update(bpm) {
//!         println!("drift at {:?}", detector.last_drift());
//!     }
//! }
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod drift;
pub mod federated;
pub mod metrics;
pub mod model;
pub mod monitor;
pub mod registry;
pub mod report;
pub mod simulation;

pub use core::error::{Error, Result};
