//! Cohort balance analysis.
//!
//! The federated mean weights every cohort equally regardless of size. This
//! module measures how far the participating cohorts are from equal size and
//! label balance so a round can report when small cohorts carry outsized
//! influence. It never changes the averaging itself.

use crate::data::CohortDataset;
use serde::{Deserialize, Serialize};

/// Size and label statistics for one cohort.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CohortStats {
    /// Cohort name
    pub cohort: String,
    /// Number of samples
    pub sample_count: usize,
    /// Fraction of positive labels
    pub positive_rate: f64,
}

/// Balance of a round's participants.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortBalance {
    /// Per-cohort statistics
    pub profiles: Vec<CohortStats>,
    /// Largest over smallest sample count (1.0 when balanced)
    pub size_ratio: f64,
    /// Spread between the highest and lowest positive rate
    pub label_skew: f64,
}

impl CohortBalance {
    /// Analyze the given cohorts.
    pub fn analyze<'a>(cohorts: impl IntoIterator<Item = &'a CohortDataset>) -> Self {
        let profiles: Vec<CohortStats> = cohorts
            .into_iter()
            .map(|c| CohortStats {
                cohort: c.name.clone(),
                sample_count: c.len(),
                positive_rate: c.positive_rate(),
            })
            .collect();

        if profiles.is_empty() {
            return Self::default();
        }

        let max_n = profiles.iter().map(|p| p.sample_count).max().unwrap_or(0);
        let min_n = profiles.iter().map(|p| p.sample_count).min().unwrap_or(0);
        let size_ratio = if min_n == 0 {
            f64::INFINITY
        } else {
            max_n as f64 / min_n as f64
        };

        let rates = profiles.iter().map(|p| p.positive_rate);
        let max_rate = rates.clone().fold(f64::MIN, f64::max);
        let min_rate = rates.fold(f64::MAX, f64::min);

        Self {
            profiles,
            size_ratio,
            label_skew: max_rate - min_rate,
        }
    }

    /// Check if the size ratio exceeds `threshold`.
    pub fn is_imbalanced(&self, threshold: f64) -> bool {
        self.size_ratio > threshold
    }

    /// Influence each cohort has under the unweighted mean.
    pub fn unweighted_shares(&self) -> Vec<(String, f64)> {
        let n = self.profiles.len().max(1) as f64;
        self.profiles.iter().map(|p| (p.cohort.clone(), 1.0 / n)).collect()
    }

    /// Influence each cohort would have if weighted by sample count.
    pub fn size_shares(&self) -> Vec<(String, f64)> {
        let total: usize = self.profiles.iter().map(|p| p.sample_count).sum();
        self.profiles
            .iter()
            .map(|p| {
                let share = if total == 0 {
                    0.0
                } else {
                    p.sample_count as f64 / total as f64
                };
                (p.cohort.clone(), share)
            })
            .collect()
    }

    /// Largest absolute gap between unweighted and size-proportional shares.
    pub fn max_share_gap(&self) -> f64 {
        self.unweighted_shares()
            .iter()
            .zip(self.size_shares())
            .map(|((_, u), (_, s))| (u - s).abs())
            .fold(0.0, f64::max)
    }
}
