//! Shared run state passed to every callback
//!
//! `RunState` replaces the loosely keyed state dictionary found in dynamic
//! runner implementations with an explicit struct. Fields that only exist
//! during part of the lifecycle are `Option`s with documented phase
//! invariants, so callbacks never probe for key presence at runtime.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RunnerError};

/// Mutable context shared by reference across all callbacks during a run.
///
/// Phase invariants:
///
/// * `epoch` is `Some` from just before `EpochStarted` dispatch until the
///   epoch loop exits; `None` when `Started` and `Finished` fire.
/// * `batch` and `output` are `Some` only inside a batch body and are
///   cleared before `EpochFinished` fires.
/// * `n_iters` equals the number of `BatchFinished` emissions, counting the
///   one currently being dispatched.
/// * `running` is `true` for the whole of a run except after a stop request,
///   and is always `false` once `Finished` has fired.
///
/// The state is serializable (given serializable batch and output types) so
/// that an interrupted run can be persisted by a checkpoint sink and later
/// restored for [`Runner::resume`](crate::runner::Runner::resume).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState<B, O> {
    /// Batch values making up one epoch; re-iterated once per epoch.
    pub batches: Vec<B>,
    /// Upper bound on the number of epochs.
    pub max_epoch: usize,
    /// Current 1-based epoch number, while an epoch is active.
    pub epoch: Option<usize>,
    /// Current (possibly transformed) batch, while a batch is active.
    pub batch: Option<B>,
    /// Processor result for the current batch.
    pub output: Option<O>,
    /// Continuation flag; cleared by [`request_stop`](Self::request_stop).
    pub running: bool,
    /// Count of batches processed so far across the whole run.
    pub n_iters: usize,
    /// Named scalar values published by handlers (reducers, evaluation
    /// callbacks) and read by others (early stopping, checkpointing).
    pub metrics: BTreeMap<String, f64>,
}

impl<B, O> RunState<B, O> {
    pub(crate) fn new(batches: Vec<B>, max_epoch: usize) -> Self {
        Self {
            batches,
            max_epoch,
            epoch: None,
            batch: None,
            output: None,
            running: false,
            n_iters: 0,
            metrics: BTreeMap::new(),
        }
    }

    /// Ask the loop to stop after the current unit of work.
    ///
    /// This only clears the continuation flag. The callback that calls it
    /// keeps executing, as do the remaining callbacks registered for the
    /// event being dispatched; the loop then finishes the in-flight batch
    /// and epoch through their closing events before winding down.
    pub fn request_stop(&mut self) {
        self.running = false;
    }

    /// Whether the loop will start another unit of work.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Store a named scalar metric.
    pub fn insert_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }

    /// Look up a named scalar metric.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Look up a metric that must be present, failing loudly when it is not.
    pub fn require_metric(&self, name: &str) -> Result<f64> {
        self.metric(name)
            .ok_or_else(|| RunnerError::MissingMetric(name.to_string()))
    }

    /// Number of whole epochs completed, derived from `n_iters`.
    pub fn epochs_completed(&self) -> usize {
        if self.batches.is_empty() {
            0
        } else {
            self.n_iters / self.batches.len()
        }
    }

    /// Position inside the current epoch, derived from `n_iters`.
    pub fn epoch_offset(&self) -> usize {
        if self.batches.is_empty() {
            0
        } else {
            self.n_iters % self.batches.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let state: RunState<i32, i32> = RunState::new(vec![1, 2, 3], 4);
        assert_eq!(state.batches, vec![1, 2, 3]);
        assert_eq!(state.max_epoch, 4);
        assert!(state.epoch.is_none());
        assert!(state.batch.is_none());
        assert!(state.output.is_none());
        assert!(!state.running);
        assert_eq!(state.n_iters, 0);
        assert!(state.metrics.is_empty());
    }

    #[test]
    fn test_request_stop() {
        let mut state: RunState<i32, i32> = RunState::new(vec![1], 1);
        state.running = true;
        assert!(state.is_running());
        state.request_stop();
        assert!(!state.is_running());
    }

    #[test]
    fn test_metrics_roundtrip() {
        let mut state: RunState<i32, i32> = RunState::new(vec![1], 1);
        state.insert_metric("loss", 0.25);
        assert_eq!(state.metric("loss"), Some(0.25));
        assert_eq!(state.require_metric("loss").unwrap(), 0.25);
        assert!(matches!(
            state.require_metric("accuracy"),
            Err(RunnerError::MissingMetric(name)) if name == "accuracy"
        ));
    }

    #[test]
    fn test_position_helpers() {
        let mut state: RunState<i32, i32> = RunState::new(vec![10, 20, 30], 4);
        state.n_iters = 7;
        assert_eq!(state.epochs_completed(), 2);
        assert_eq!(state.epoch_offset(), 1);

        let empty: RunState<i32, i32> = RunState::new(vec![], 1);
        assert_eq!(empty.epochs_completed(), 0);
        assert_eq!(empty.epoch_offset(), 0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut state: RunState<i32, f64> = RunState::new(vec![3, 5], 2);
        state.n_iters = 3;
        state.insert_metric("loss", 1.5);
        let json = serde_json::to_string(&state).unwrap();
        let restored: RunState<i32, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.batches, vec![3, 5]);
        assert_eq!(restored.n_iters, 3);
        assert_eq!(restored.metric("loss"), Some(1.5));
    }
}
