//! L2-regularized logistic regression.

use crate::config::TrainerConfig;
use serde::{Deserialize, Serialize};

/// Binary linear classifier `σ(w·x + b)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Weight vector
    pub weights: Vec<f64>,
    /// Intercept
    pub bias: f64,
    /// Gradient steps taken during fitting
    pub iterations: usize,
}

impl LogisticRegression {
    /// Fit by full-batch gradient descent on the mean log-loss plus
    /// `||w||² / (2·C·n)`. Starts from zero, so fitting is deterministic.
    pub fn fit(x: &[Vec<f64>], y: &[u8], config: &TrainerConfig) -> Self {
        let dim = x.first().map(Vec::len).unwrap_or(0);
        let n = x.len().max(1) as f64;
        let penalty = 1.0 / (config.inverse_regularization * n);

        let mut weights = vec![0.0; dim];
        let mut bias = 0.0;
        let mut iterations = 0;

        let mut grad_w = vec![0.0; dim];
        while iterations < config.max_iter {
            grad_w.fill(0.0);
            let mut grad_b = 0.0;

            for (row, &label) in x.iter().zip(y) {
                let err = sigmoid(dot(&weights, row) + bias) - f64::from(label);
                for (g, xi) in grad_w.iter_mut().zip(row) {
                    *g += err * xi;
                }
                grad_b += err;
            }

            let mut norm = 0.0;
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g = *g / n + penalty * w;
                norm += *g * *g;
            }
            grad_b /= n;
            norm += grad_b * grad_b;

            iterations += 1;
            if norm.sqrt() < config.tolerance {
                break;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= config.learning_rate * g;
            }
            bias -= config.learning_rate * grad_b;
        }

        Self {
            weights,
            bias,
            iterations,
        }
    }

    /// Positive-class probability.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(dot(&self.weights, row) + self.bias)
    }

    /// Hard label at the 0.5 threshold.
    pub fn predict(&self, row: &[f64]) -> u8 {
        u8::from(self.predict_proba(row) >= 0.5)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
