//! Drift monitor.
//!
//! Feeds a signal stream to the detector and swaps the registry's active
//! model when drift is signaled.

use crate::config::DriftConfig;
use crate::core::{now, Error, Result, Timestamp};
use crate::drift::{DriftDetector, DriftEvent, DriftState};
use crate::metrics::AccuracyRecord;
use crate::registry::ModelRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Swap events retained by a monitor.
pub const MAX_SWAP_HISTORY: usize = 32;

/// Record of a drift-triggered swap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapEvent {
    /// Event ID
    pub id: Uuid,
    /// The drift that caused the swap
    pub drift: DriftEvent,
    /// Previously active cohort
    pub from: String,
    /// Newly active cohort
    pub to: String,
    /// Post-swap accuracy
    pub record: AccuracyRecord,
    /// Swap time
    pub at: Timestamp,
}

/// Owns a detector and drives swaps on a shared registry.
pub struct DriftMonitor {
    detector: DriftDetector,
    registry: Arc<ModelRegistry>,
    swaps: Vec<SwapEvent>,
}

impl DriftMonitor {
    /// Create a monitor.
    pub fn new(config: DriftConfig, registry: Arc<ModelRegistry>) -> Result<Self> {
        Ok(Self {
            detector: DriftDetector::new(config)?,
            registry,
            swaps: Vec::new(),
        })
    }

    /// Feed one observation. On drift, swap to `target` and start a new
    /// detection epoch.
    ///
    /// If a previous swap failed the detector is still signaled; the value is
    /// not observed and the swap is retried.
    pub async fn observe(&mut self, value: f64, target: &str) -> Result<Option<SwapEvent>> {
        let pending = self.detector.state() == DriftState::DriftSignaled;
        if !pending && !self.detector.try_update(value)? {
            return Ok(None);
        }

        let drift = self
            .detector
            .last_drift()
            .cloned()
            .ok_or_else(|| Error::Internal("drift signaled without an event".into()))?;
        let from = self.registry.active_name();

        let record = match self.registry.swap(target).await {
            Ok(record) => record,
            Err(e) => {
                error!(index = drift.index, to = target, error = %e, "drift swap failed");
                return Err(e);
            }
        };
        self.detector.reset();

        let event = SwapEvent {
            id: Uuid::new_v4(),
            drift,
            from,
            to: target.to_string(),
            record,
            at: now(),
        };
        info!(
            id = %event.id,
            index = event.drift.index,
            from = %event.from,
            to = %event.to,
            accuracy = event.record.accuracy,
            "drift handled"
        );
        self.swaps.push(event.clone());
        if self.swaps.len() > MAX_SWAP_HISTORY {
            self.swaps.remove(0);
        }
        Ok(Some(event))
    }

    /// Feed a batch, stopping at the first swap.
    pub async fn observe_all(&mut self, values: &[f64], target: &str) -> Result<Option<SwapEvent>> {
        for &value in values {
            if let Some(event) = self.observe(value, target).await? {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }

    /// The detector.
    pub fn detector(&self) -> &DriftDetector {
        &self.detector
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Most recent swaps, oldest first, at most `MAX_SWAP_HISTORY`.
    pub fn swaps(&self) -> &[SwapEvent] {
        &self.swaps
    }
}
