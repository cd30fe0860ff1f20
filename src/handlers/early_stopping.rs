//! Early stopping handler

use crate::error::Result;
use crate::event::Event;
use crate::runner::Runner;
use crate::state::RunState;

use super::attachment::Attachment;
use super::improvement::Improvement;

/// Stops the run when a monitored metric stops improving.
///
/// Listens on `EpochFinished`, reads the metric from the run state, and
/// counts consecutive epochs without improvement. Once that count exceeds
/// `patience`, the handler requests a stop; the run still winds down
/// through its remaining finalization events.
///
/// The metric must be present in the state when the handler fires, so the
/// callback that computes it (an evaluation pass, a reduction) has to be
/// registered before this one. A missing metric is a loud error, never a
/// silently skipped check.
///
/// # Example
///
/// ```
/// use corredor::Runner;
/// use corredor::handlers::EarlyStopper;
///
/// let mut runner: Runner<i32, f64> = Runner::new();
/// runner.attach(EarlyStopper::new("loss", 2));
/// ```
#[derive(Debug, Clone)]
pub struct EarlyStopper {
    metric: String,
    patience: usize,
    criterion: Improvement,
    best: Option<f64>,
    n_bad_epochs: usize,
}

impl EarlyStopper {
    /// Watch `metric`, stopping after more than `patience` consecutive
    /// epochs without improvement. Lower values count as better by
    /// default.
    pub fn new(metric: impl Into<String>, patience: usize) -> Self {
        Self {
            metric: metric.into(),
            patience,
            criterion: Improvement::min(),
            best: None,
            n_bad_epochs: 0,
        }
    }

    /// Replace the improvement criterion.
    pub fn with_criterion(mut self, criterion: Improvement) -> Self {
        self.criterion = criterion;
        self
    }

    /// Record one epoch's value; returns true when patience is exhausted.
    fn observe(&mut self, value: f64) -> bool {
        if self.criterion.is_improvement(value, self.best) {
            self.best = Some(value);
            self.n_bad_epochs = 0;
        } else {
            self.n_bad_epochs += 1;
        }
        self.n_bad_epochs > self.patience
    }

    fn on_epoch_finished<B, O>(&mut self, state: &mut RunState<B, O>) -> Result<()> {
        let value = state.require_metric(&self.metric)?;
        if self.observe(value) {
            eprintln!("Patience exceeded for {}, stopping early", self.metric);
            state.request_stop();
        }
        Ok(())
    }
}

impl<B: 'static, O: 'static> Attachment<B, O> for EarlyStopper {
    fn attach_on(self, runner: &mut Runner<B, O>) {
        let mut stopper = self;
        runner.on(Event::EpochFinished, move |state| {
            stopper.on_epoch_finished(state)
        });
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// With a constant metric, the stop always lands after exactly
        /// patience + 2 epochs (baseline plus patience + 1 bad epochs).
        #[test]
        fn stops_after_patience_exhausted(patience in 0usize..6) {
            let mut runner: Runner<i32, i32> = Runner::new();
            runner.on(Event::EpochFinished, |state| {
                state.insert_metric("loss", 1.0);
                Ok(())
            });
            runner.attach(EarlyStopper::new("loss", patience));

            let state = runner.run(|b| Ok(*b), vec![0], 100).unwrap();
            prop_assert_eq!(state.n_iters, patience + 2);
        }
    }
}
