//! Federated Learning Module
//!
//! Per-cohort training with a shared parameter estimate:
//! - Local training and artifact persistence per cohort
//! - Unweighted FedAvg over cohort parameters
//! - Cohort size and label-balance analysis

pub mod aggregator;
pub mod learner;
pub mod noniid;

pub use aggregator::{federated_average, ExcludedCohort, FederatedAggregator, GlobalParameters, RoundSummary};
pub use learner::{LocalTrainer, LocalUpdate};
pub use noniid::CohortBalance;
