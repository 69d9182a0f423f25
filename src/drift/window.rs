//! Exponential-histogram window.
//!
//! Observations are summarized in buckets whose capacity doubles per level.
//! Each level holds at most two buckets; a third merges the two oldest into
//! one bucket of the next level. Higher levels always hold older data.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum buckets kept per level before a merge.
pub const MAX_BUCKETS_PER_LEVEL: usize = 2;

/// Summary of a run of consecutive observations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Observations summarized
    pub count: u64,
    /// Sum of the observations
    pub sum: f64,
    /// Population variance of the observations
    pub variance: f64,
    /// Level; nominal capacity is `2^capacity_exponent`
    pub capacity_exponent: u32,
}

impl Bucket {
    /// Bucket holding one observation.
    pub fn single(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            variance: 0.0,
            capacity_exponent: 0,
        }
    }

    /// Mean of the summarized observations.
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }

    /// Combine an older bucket with a newer one.
    pub fn merge(older: &Bucket, newer: &Bucket) -> Bucket {
        let (na, nb) = (older.count as f64, newer.count as f64);
        let n = na + nb;
        let diff = older.mean() - newer.mean();
        let m2 = older.variance * na + newer.variance * nb + diff * diff * na * nb / n;
        Bucket {
            count: older.count + newer.count,
            sum: older.sum + newer.sum,
            variance: m2 / n,
            capacity_exponent: older.capacity_exponent.max(newer.capacity_exponent) + 1,
        }
    }
}

/// Sliding window of buckets.
#[derive(Clone, Debug, Default)]
pub struct AdaptiveWindow {
    /// `levels[k]` holds level-k buckets, oldest at the front
    levels: Vec<VecDeque<Bucket>>,
    width: u64,
    total: f64,
}

impl AdaptiveWindow {
    /// Create an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one observation, merging as needed.
    pub fn push(&mut self, value: f64) {
        if self.levels.is_empty() {
            self.levels.push(VecDeque::new());
        }
        self.levels[0].push_back(Bucket::single(value));
        self.width += 1;
        self.total += value;

        let mut level = 0;
        while self.levels[level].len() > MAX_BUCKETS_PER_LEVEL {
            let (Some(older), Some(newer)) = (self.levels[level].pop_front(), self.levels[level].pop_front())
            else {
                break;
            };
            let mut merged = Bucket::merge(&older, &newer);
            merged.capacity_exponent = level as u32 + 1;
            if self.levels.len() == level + 1 {
                self.levels.push(VecDeque::new());
            }
            self.levels[level + 1].push_back(merged);
            level += 1;
        }
    }

    /// Buckets from oldest to newest.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> + '_ {
        self.levels.iter().rev().flat_map(|level| level.iter())
    }

    /// Number of buckets held.
    pub fn bucket_count(&self) -> usize {
        self.levels.iter().map(VecDeque::len).sum()
    }

    /// Observations currently summarized.
    pub fn width(&self) -> u64 {
        self.width
    }

    /// Sum of the window.
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Mean of the window, 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.width == 0 {
            0.0
        } else {
            self.total / self.width as f64
        }
    }

    /// Pooled population variance of the window, 0 when empty.
    pub fn variance(&self) -> f64 {
        if self.width == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let m2: f64 = self
            .buckets()
            .map(|b| {
                let d = b.mean() - mean;
                b.variance * b.count as f64 + b.count as f64 * d * d
            })
            .sum();
        m2 / self.width as f64
    }

    /// Drop the `n` oldest buckets. Returns the observations removed.
    pub fn drop_oldest(&mut self, mut n: usize) -> u64 {
        let mut removed = 0;
        for level in self.levels.iter_mut().rev() {
            while n > 0 {
                let Some(bucket) = level.pop_front() else { break };
                removed += bucket.count;
                self.total -= bucket.sum;
                n -= 1;
            }
        }
        while self.levels.last().is_some_and(VecDeque::is_empty) {
            self.levels.pop();
        }
        self.width -= removed;
        if self.width == 0 {
            self.total = 0.0;
        }
        removed
    }

    /// Empty the window.
    pub fn clear(&mut self) {
        self.levels.clear();
        self.width = 0;
        self.total = 0.0;
    }
}
