//! Parameter aggregation for federated learning.
//!
//! Implements the unweighted federated average and the round loop that
//! trains every cohort in parallel before reducing.

use crate::config::AggregatorConfig;
use crate::core::{now, Error, Result, Timestamp};
use crate::data::{CohortDataset, DatasetProvider};
use crate::federated::learner::{LocalTrainer, LocalUpdate};
use crate::federated::noniid::CohortBalance;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Global estimate produced by one round. Used for analysis only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalParameters {
    /// Round number (1-based)
    pub round: u32,
    /// Elementwise mean of cohort weights
    pub weights: Vec<f64>,
    /// Mean of cohort intercepts
    pub bias: f64,
    /// Cohorts included in the mean
    pub participants: Vec<String>,
}

impl GlobalParameters {
    /// Encoded feature width.
    pub fn dim(&self) -> usize {
        self.weights.len()
    }
}

/// A cohort left out of a round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExcludedCohort {
    /// Cohort name
    pub cohort: String,
    /// Why it was excluded
    pub reason: String,
}

/// Outcome of one round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Round number (1-based)
    pub round: u32,
    /// Global estimate
    pub global: GlobalParameters,
    /// Cohorts excluded by local failures
    pub excluded: Vec<ExcludedCohort>,
    /// Participant balance
    pub balance: CohortBalance,
    /// Completion time
    pub completed_at: Timestamp,
}

/// Unweighted elementwise mean of cohort parameters.
///
/// Every update must have the same width; nothing is broadcast or truncated.
pub fn federated_average(round: u32, updates: &[LocalUpdate]) -> Result<GlobalParameters> {
    let first = updates.first().ok_or(Error::EmptyRound(round))?;
    let dim = first.dim();

    if let Some(bad) = updates.iter().find(|u| u.dim() != dim) {
        return Err(Error::DimensionMismatch {
            cohort: bad.cohort.clone(),
            expected: dim,
            found: bad.dim(),
        });
    }

    let n = updates.len() as f64;
    let mut weights = vec![0.0; dim];
    let mut bias = 0.0;
    for update in updates {
        for (acc, w) in weights.iter_mut().zip(&update.weights) {
            *acc += w;
        }
        bias += update.bias;
    }
    for w in &mut weights {
        *w /= n;
    }

    Ok(GlobalParameters {
        round,
        weights,
        bias: bias / n,
        participants: updates.iter().map(|u| u.cohort.clone()).collect(),
    })
}

/// Runs training rounds across all cohorts.
pub struct FederatedAggregator {
    trainer: LocalTrainer,
    cohorts: Vec<Arc<CohortDataset>>,
    config: AggregatorConfig,
    rounds_completed: u32,
    history: Vec<RoundSummary>,
}

impl FederatedAggregator {
    /// Create an aggregator over the given cohorts.
    pub fn new(trainer: LocalTrainer, cohorts: Vec<Arc<CohortDataset>>, config: AggregatorConfig) -> Self {
        Self {
            trainer,
            cohorts,
            config,
            rounds_completed: 0,
            history: Vec::new(),
        }
    }

    /// Create an aggregator over the named cohorts of a provider.
    pub fn from_provider(
        trainer: LocalTrainer,
        provider: &dyn DatasetProvider,
        names: &[String],
        config: AggregatorConfig,
    ) -> Result<Self> {
        let cohorts = names
            .iter()
            .map(|name| {
                provider
                    .cohort(name)
                    .ok_or_else(|| Error::Config(format!("dataset provider has no cohort {}", name)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(trainer, cohorts, config))
    }

    /// Train every cohort independently, wait for all, then average.
    pub async fn train_round(&mut self) -> Result<RoundSummary> {
        let round = self.rounds_completed + 1;
        info!(round, cohorts = self.cohorts.len(), "federated round started");

        let tasks = self.cohorts.iter().cloned().map(|cohort| {
            let trainer = self.trainer.clone();
            tokio::task::spawn_blocking(move || {
                let result = trainer.train(&cohort);
                (cohort, result)
            })
        });
        let joined = futures::future::join_all(tasks).await;

        let mut updates = Vec::with_capacity(joined.len());
        let mut participants = Vec::with_capacity(joined.len());
        let mut excluded = Vec::new();
        for outcome in joined {
            let (cohort, result) = outcome?;
            match result {
                Ok(update) => {
                    updates.push(update);
                    participants.push(cohort);
                }
                Err(e) if e.is_cohort_local() => {
                    warn!(round, cohort = %cohort.name, error = %e, "cohort excluded from round");
                    excluded.push(ExcludedCohort {
                        cohort: cohort.name.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        let global = federated_average(round, &updates)?;

        let balance = CohortBalance::analyze(participants.iter().map(|c| c.as_ref()));
        if balance.is_imbalanced(self.config.imbalance_warning_ratio) {
            warn!(
                round,
                size_ratio = balance.size_ratio,
                share_gap = balance.max_share_gap(),
                "cohort sizes differ; unweighted mean gives small cohorts equal influence"
            );
        }

        self.rounds_completed = round;
        info!(
            round,
            participants = global.participants.len(),
            excluded = excluded.len(),
            dim = global.dim(),
            bias = global.bias,
            "federated round averaged"
        );

        let summary = RoundSummary {
            round,
            global,
            excluded,
            balance,
            completed_at: now(),
        };
        self.history.push(summary.clone());
        Ok(summary)
    }

    /// Run `rounds` consecutive rounds.
    pub async fn run(&mut self, rounds: u32) -> Result<Vec<RoundSummary>> {
        let mut summaries = Vec::with_capacity(rounds as usize);
        for _ in 0..rounds {
            summaries.push(self.train_round().await?);
        }
        Ok(summaries)
    }

    /// Run the configured number of rounds.
    pub async fn run_configured(&mut self) -> Result<Vec<RoundSummary>> {
        self.run(self.config.rounds).await
    }

    /// Rounds finished so far.
    pub fn rounds_completed(&self) -> u32 {
        self.rounds_completed
    }

    /// Most recent global estimate.
    pub fn latest(&self) -> Option<&GlobalParameters> {
        self.history.last().map(|s| &s.global)
    }

    /// All round summaries.
    pub fn history(&self) -> &[RoundSummary] {
        &self.history
    }

    /// Participating cohort names.
    pub fn cohort_names(&self) -> Vec<&str> {
        self.cohorts.iter().map(|c| c.name.as_str()).collect()
    }
}
