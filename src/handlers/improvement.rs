//! Improvement criterion shared by early stopping and checkpointing

use serde::{Deserialize, Serialize};

/// Whether lower or higher values count as better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Lower is better, e.g. a loss.
    Min,
    /// Higher is better, e.g. an accuracy.
    Max,
}

/// Decides whether a candidate value improves on the best seen so far.
///
/// A candidate must beat the best value by at least `eps` to count; with no
/// best value yet, any candidate is an improvement.
///
/// # Example
///
/// ```
/// use corredor::handlers::Improvement;
///
/// let criterion = Improvement::min().with_eps(0.01);
/// assert!(criterion.is_improvement(0.5, None));
/// assert!(criterion.is_improvement(0.4, Some(0.5)));
/// assert!(!criterion.is_improvement(0.495, Some(0.5)));
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Improvement {
    mode: Mode,
    eps: f64,
}

const DEFAULT_EPS: f64 = 1e-4;

impl Improvement {
    /// Criterion where lower values are improvements.
    pub fn min() -> Self {
        Self {
            mode: Mode::Min,
            eps: DEFAULT_EPS,
        }
    }

    /// Criterion where higher values are improvements.
    pub fn max() -> Self {
        Self {
            mode: Mode::Max,
            eps: DEFAULT_EPS,
        }
    }

    /// Require the value to improve by at least this amount.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Whether `candidate` improves on `best`.
    pub fn is_improvement(&self, candidate: f64, best: Option<f64>) -> bool {
        match best {
            None => true,
            Some(best) => match self.mode {
                Mode::Min => candidate <= best - self.eps,
                Mode::Max => candidate >= best + self.eps,
            },
        }
    }
}
