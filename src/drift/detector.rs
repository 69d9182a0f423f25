//! Adaptive-window drift detector.

use crate::config::DriftConfig;
use crate::core::{Error, Result};
use crate::drift::window::AdaptiveWindow;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Detector state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriftState {
    /// Watching the stream
    Stable,
    /// Drift reported; updates are ignored until reset
    DriftSignaled,
}

/// A detected change in the stream mean.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftEvent {
    /// Index of the triggering observation, counted from the last reset
    pub index: u64,
    /// Mean of the dropped older sub-window
    pub mean_before: f64,
    /// Mean of the retained newer sub-window
    pub mean_after: f64,
    /// Observations dropped from the window
    pub dropped: u64,
}

/// Single-consumer drift detector over a numeric stream.
#[derive(Clone, Debug)]
pub struct DriftDetector {
    config: DriftConfig,
    window: AdaptiveWindow,
    state: DriftState,
    observations: u64,
    last_drift: Option<DriftEvent>,
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self::with_valid_config(DriftConfig::default())
    }
}

impl DriftDetector {
    /// Create a detector.
    pub fn new(config: DriftConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: DriftConfig) -> Self {
        Self {
            config,
            window: AdaptiveWindow::new(),
            state: DriftState::Stable,
            observations: 0,
            last_drift: None,
        }
    }

    /// Feed one value. Returns true exactly when this value signals drift.
    ///
    /// Non-finite values are logged and skipped.
    pub fn update(&mut self, value: f64) -> bool {
        match self.try_update(value) {
            Ok(drift) => drift,
            Err(e) => {
                warn!(error = %e, "observation ignored");
                false
            }
        }
    }

    /// Feed one value, rejecting non-finite input.
    pub fn try_update(&mut self, value: f64) -> Result<bool> {
        if !value.is_finite() {
            return Err(Error::InvalidObservation(value));
        }
        if self.state == DriftState::DriftSignaled {
            return Ok(false);
        }

        let index = self.observations;
        self.observations += 1;
        self.window.push(value);

        if self.window.width() < self.config.grace_period || self.observations % self.config.clock != 0 {
            return Ok(false);
        }

        match self.find_cut() {
            Some((buckets, mean_before, mean_after)) => {
                let dropped = self.window.drop_oldest(buckets);
                let event = DriftEvent {
                    index,
                    mean_before,
                    mean_after,
                    dropped,
                };
                info!(
                    index,
                    mean_before,
                    mean_after,
                    dropped,
                    width = self.window.width(),
                    "drift signaled"
                );
                self.last_drift = Some(event);
                self.state = DriftState::DriftSignaled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Scan splits oldest to newest. Returns the number of left buckets and
    /// both sub-window means for the first split whose gap exceeds the bound.
    fn find_cut(&self) -> Option<(usize, f64, f64)> {
        let n = self.window.width();
        let total = self.window.total();
        let variance = self.window.variance();
        let bound_log = (4.0 * n as f64 / self.config.delta).ln();
        let buckets = self.window.bucket_count();

        let mut n_left = 0u64;
        let mut sum_left = 0.0;
        for (i, bucket) in self.window.buckets().take(buckets.saturating_sub(1)).enumerate() {
            n_left += bucket.count;
            sum_left += bucket.sum;
            let n_right = n - n_left;
            if n_left < self.config.min_sub_window || n_right < self.config.min_sub_window {
                continue;
            }

            let mean_left = sum_left / n_left as f64;
            let mean_right = (total - sum_left) / n_right as f64;
            let m = 1.0 / (1.0 / n_left as f64 + 1.0 / n_right as f64);
            let eps = (2.0 * variance * bound_log / m).sqrt() + 2.0 * bound_log / (3.0 * m);

            if (mean_left - mean_right).abs() >= eps {
                return Some((i + 1, mean_left, mean_right));
            }
        }
        None
    }

    /// Clear the window and return to `Stable`.
    pub fn reset(&mut self) {
        self.window.clear();
        self.state = DriftState::Stable;
        self.observations = 0;
    }

    /// Current state.
    pub fn state(&self) -> DriftState {
        self.state
    }

    /// Observations in the window.
    pub fn width(&self) -> u64 {
        self.window.width()
    }

    /// Window mean.
    pub fn mean(&self) -> f64 {
        self.window.mean()
    }

    /// Window variance.
    pub fn variance(&self) -> f64 {
        self.window.variance()
    }

    /// Buckets held.
    pub fn bucket_count(&self) -> usize {
        self.window.bucket_count()
    }

    /// Values accepted since the last reset.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Most recent drift, kept across resets.
    pub fn last_drift(&self) -> Option<&DriftEvent> {
        self.last_drift.as_ref()
    }

    /// Active settings.
    pub fn config(&self) -> &DriftConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::heart_rate_stream;

    fn first_drift(detector: &mut DriftDetector, values: &[f64]) -> Option<usize> {
        values.iter().position(|&v| detector.update(v))
    }

    #[test]
    fn test_stationary_stream_has_no_drift() {
        for seed in 0..20 {
            let stream = heart_rate_stream(100, 70.0, 2.0, usize::MAX, 0.0, seed);
            let mut detector = DriftDetector::default();
            assert_eq!(first_drift(&mut detector, &stream), None, "seed {}", seed);
            assert_eq!(detector.state(), DriftState::Stable);
            assert_eq!(detector.width(), 100);
        }
    }

    #[test]
    fn test_step_detected_shortly_after_change() {
        for seed in 0..20 {
            let stream = heart_rate_stream(100, 70.0, 2.0, 50, 20.0, seed);
            let mut detector = DriftDetector::default();
            let hit = first_drift(&mut detector, &stream).expect("drift not detected");
            assert!((50..=60).contains(&hit), "seed {} hit {}", seed, hit);

            let event = detector.last_drift().unwrap();
            assert_eq!(event.index, hit as u64);
            assert!(event.mean_after > event.mean_before);
            assert_eq!(detector.state(), DriftState::DriftSignaled);
            assert_eq!(detector.width() + event.dropped, hit as u64 + 1);
        }
    }

    #[test]
    fn test_step_after_stationary_prefix() {
        let prefix = heart_rate_stream(100, 70.0, 2.0, usize::MAX, 0.0, 11);
        let stepped = heart_rate_stream(100, 70.0, 2.0, 50, 20.0, 12);
        let stream: Vec<f64> = prefix.into_iter().chain(stepped).collect();

        let mut detector = DriftDetector::default();
        let hit = first_drift(&mut detector, &stream).expect("drift not detected");
        assert!((150..=160).contains(&hit), "hit {}", hit);
    }

    #[test]
    fn test_large_step_detected_quickly() {
        let stream = heart_rate_stream(1000, 0.0, 1.0, 500, 10.0, 4);
        let mut detector = DriftDetector::default();
        let hit = first_drift(&mut detector, &stream).expect("drift not detected");
        assert!((500..=510).contains(&hit), "hit {}", hit);
    }

    #[test]
    fn test_no_false_positives_on_long_streams() {
        let detections = (0..10)
            .filter(|&trial| {
                let stream = heart_rate_stream(3000, 0.0, 1.0, usize::MAX, 0.0, 1000 + trial);
                let mut detector = DriftDetector::default();
                first_drift(&mut detector, &stream).is_some()
            })
            .count();
        assert_eq!(detections, 0);
    }

    #[test]
    fn test_memory_is_logarithmic() {
        let stream = heart_rate_stream(100_000, 70.0, 2.0, usize::MAX, 0.0, 5);
        let mut detector = DriftDetector::default();
        for v in stream {
            detector.update(v);
        }
        let n = detector.width() as f64;
        assert!(detector.bucket_count() as f64 <= 2.0 * (n.log2() + 2.0));
    }

    #[test]
    fn test_signaled_detector_ignores_updates() {
        let stream = heart_rate_stream(100, 70.0, 2.0, 50, 20.0, 1);
        let mut detector = DriftDetector::default();
        first_drift(&mut detector, &stream).unwrap();

        let width = detector.width();
        let observations = detector.observations();
        assert!(!detector.update(500.0));
        assert_eq!(detector.width(), width);
        assert_eq!(detector.observations(), observations);
    }

    #[test]
    fn test_reset_starts_new_epoch() {
        let stream = heart_rate_stream(100, 70.0, 2.0, 50, 20.0, 2);
        let mut detector = DriftDetector::default();
        first_drift(&mut detector, &stream).unwrap();

        detector.reset();
        assert_eq!(detector.state(), DriftState::Stable);
        assert_eq!(detector.width(), 0);
        assert_eq!(detector.bucket_count(), 0);
        assert_eq!(detector.observations(), 0);
        assert!(detector.last_drift().is_some());

        let hit = first_drift(&mut detector, &stream).unwrap();
        assert!((50..=60).contains(&hit));
    }

    #[test]
    fn test_non_finite_input() {
        let mut detector = DriftDetector::default();
        assert!(matches!(detector.try_update(f64::NAN), Err(Error::InvalidObservation(_))));
        assert!(!detector.update(f64::INFINITY));
        assert_eq!(detector.observations(), 0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(DriftDetector::new(DriftConfig::default().with_delta(0.0)).is_err());
        assert!(DriftDetector::new(DriftConfig::default()).is_ok());
    }

    #[test]
    fn test_grace_period_delays_testing() {
        let mut stream = vec![0.0; 30];
        stream.extend(vec![100.0; 60]);

        let early = first_drift(&mut DriftDetector::default(), &stream).unwrap();
        assert!(early < 59);

        let config = DriftConfig {
            grace_period: 60,
            ..DriftConfig::default()
        };
        let mut detector = DriftDetector::new(config).unwrap();
        assert_eq!(first_drift(&mut detector, &stream), Some(59));
    }
}
