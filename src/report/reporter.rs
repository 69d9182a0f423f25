//! Before/after accuracy comparison.
//!
//! Reads the two stage records from a metrics sink and renders them.

use crate::core::{now, Error, Result, Timestamp};
use crate::metrics::{MetricsSink, Stage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const BAR_WIDTH: usize = 40;
const BEFORE_LABEL: &str = "Before drift (centralized model)";
const AFTER_LABEL: &str = "After drift (swapped federated model)";

/// Accuracy before and after the swap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Pre-swap accuracy
    pub before: f64,
    /// Post-swap accuracy
    pub after: f64,
    /// `after - before`
    pub delta: f64,
    /// Generated timestamp
    pub generated: Timestamp,
}

impl Comparison {
    /// Build a comparison from two accuracies.
    pub fn new(before: f64, after: f64) -> Self {
        Self {
            before,
            after,
            delta: after - before,
            generated: now(),
        }
    }

    /// Check if the swap improved accuracy.
    pub fn improved(&self) -> bool {
        self.delta > 0.0
    }
}

/// Reads stage records and renders comparisons. Holds no state of its own.
pub struct EvaluationReporter {
    sink: Arc<dyn MetricsSink>,
}

impl EvaluationReporter {
    /// Create a reporter over a sink.
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    /// Read both stages and compute the delta.
    pub async fn compare(&self) -> Result<Comparison> {
        let before = self.require(Stage::PreSwap).await?;
        let after = self.require(Stage::PostSwap).await?;
        Ok(Comparison::new(before, after))
    }

    async fn require(&self, stage: Stage) -> Result<f64> {
        self.sink
            .read(stage)
            .await?
            .ok_or(Error::MissingRecord(stage))
    }

    /// Generate comparison as JSON.
    pub fn to_json(comparison: &Comparison) -> Result<String> {
        Ok(serde_json::to_string_pretty(comparison)?)
    }

    /// Generate comparison as a horizontal bar chart.
    pub fn render_text(comparison: &Comparison) -> String {
        let label_width = BEFORE_LABEL.len().max(AFTER_LABEL.len());
        let mut output = String::new();

        output.push_str("Model accuracy before and after drift\n");
        for (label, accuracy) in [(BEFORE_LABEL, comparison.before), (AFTER_LABEL, comparison.after)] {
            output.push_str(&format!(
                "{:<width$} |{:<bar_width$}| {:.3}\n",
                label,
                bar(accuracy),
                accuracy,
                width = label_width,
                bar_width = BAR_WIDTH
            ));
        }
        output.push_str(&format!("Delta: {:+.3}\n", comparison.delta));
        output
    }

    /// Render paired accuracy series step by step.
    ///
    /// Series of unequal length are truncated to the shorter one.
    pub fn render_trend(before: &[f64], after: &[f64]) -> String {
        let mut output = String::new();
        output.push_str(&format!("{:>4}  {:>8}  {:>8}  {:>8}\n", "step", "before", "after", "delta"));

        for (step, (b, a)) in before.iter().zip(after).enumerate() {
            output.push_str(&format!(
                "{:>4}  {:>8.3}  {:>8.3}  {:>+8.3}\n",
                step + 1,
                b,
                a,
                a - b
            ));
        }

        if before.len() != after.len() {
            output.push_str(&format!(
                "({} before / {} after points; extra points omitted)\n",
                before.len(),
                after.len()
            ));
        }
        output
    }
}

fn bar(accuracy: f64) -> String {
    let filled = (accuracy.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(filled)
}
