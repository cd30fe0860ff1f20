//! Run, resume, and dispatch logic for the runner
//!
//! The loop is single-threaded and cooperative. Events fire in the fixed
//! catalog order, callbacks for one event fire in strict registration
//! order, and cancellation happens only through the `running` flag: a stop
//! request never interrupts a callback that is already executing.
//!
//! Dispatch rule for stops: when a callback clears `running` mid-dispatch,
//! the remaining callbacks registered for that same event still run. The
//! flag is consulted only at loop boundaries, so the batch that was already
//! started still gets its `BatchFinished`, the epoch that was entered still
//! gets its `EpochFinished`, and `Finished` always fires exactly once.

use crate::error::{Result, RunnerError};
use crate::event::Event;
use crate::state::RunState;

use super::core::{Callback, Runner};

impl<B: Clone + 'static, O: 'static> Runner<B, O> {
    /// Run on the given batches for a number of epochs.
    ///
    /// `process` is invoked once per batch, between `BatchStarted` and
    /// `BatchFinished`, receiving the batch after all registered transforms
    /// have been applied. Returns the final run state.
    ///
    /// Fails fast with [`RunnerError::InvalidMaxEpoch`] when `max_epoch` is
    /// zero. Errors returned by callbacks or the processor abort the run
    /// and propagate to the caller unmodified.
    pub fn run<F>(&mut self, mut process: F, batches: Vec<B>, max_epoch: usize) -> Result<RunState<B, O>>
    where
        F: FnMut(&B) -> Result<O>,
    {
        if max_epoch == 0 {
            return Err(RunnerError::InvalidMaxEpoch);
        }
        let mut state = RunState::new(batches, max_epoch);
        self.drive(&mut process, &mut state)?;
        Ok(state)
    }

    /// Continue an interrupted run from a restored state.
    ///
    /// The position is derived from `n_iters`: the interrupted epoch is
    /// re-entered (its `EpochStarted` fires again) and its remaining
    /// batches are processed before subsequent epochs run as usual. When
    /// the runner was configured with
    /// [`repeat_interrupted_batch`](Runner::repeat_interrupted_batch), the
    /// batch that was in flight at stop time is processed again.
    ///
    /// Persistence of the state across the interruption is the caller's
    /// concern; see [`Checkpointer`](crate::handlers::Checkpointer) and
    /// [`load_state`](crate::handlers::load_state).
    pub fn resume<F>(&mut self, mut process: F, mut state: RunState<B, O>) -> Result<RunState<B, O>>
    where
        F: FnMut(&B) -> Result<O>,
    {
        if state.max_epoch == 0 {
            return Err(RunnerError::InvalidResumeState("max_epoch is zero".into()));
        }
        if state.batches.is_empty() {
            return Err(RunnerError::InvalidResumeState(
                "batch sequence is empty".into(),
            ));
        }
        let total = state.max_epoch * state.batches.len();
        if state.n_iters > total {
            return Err(RunnerError::InvalidResumeState(format!(
                "n_iters is {} but the whole run has only {} batches",
                state.n_iters, total
            )));
        }
        if self.repeat_interrupted_batch && state.epoch_offset() != 0 {
            state.n_iters -= 1;
        }
        state.epoch = None;
        state.batch = None;
        state.output = None;
        self.drive(&mut process, &mut state)?;
        Ok(state)
    }

    /// Run until a fixed number of batch iterations, cycling the batch
    /// sequence inside a single epoch bracket.
    ///
    /// Emits the same event order as [`run`](Runner::run) with exactly one
    /// `EpochStarted`/`EpochFinished` pair, and honors stop requests the
    /// same way.
    pub fn run_iters<F>(
        &mut self,
        mut process: F,
        batches: Vec<B>,
        max_iter: usize,
    ) -> Result<RunState<B, O>>
    where
        F: FnMut(&B) -> Result<O>,
    {
        if max_iter > 0 && batches.is_empty() {
            return Err(RunnerError::EmptyBatches);
        }
        let mut state = RunState::new(batches, 1);
        state.running = true;
        self.emit(Event::Started, &mut state)?;

        state.epoch = Some(1);
        self.emit(Event::EpochStarted, &mut state)?;
        if state.running {
            while state.n_iters < max_iter {
                let index = state.epoch_offset();
                self.run_batch(&mut process, &mut state, index)?;
                if !state.running {
                    break;
                }
            }
        }
        state.batch = None;
        state.output = None;
        self.emit(Event::EpochFinished, &mut state)?;

        state.epoch = None;
        state.running = false;
        self.emit(Event::Finished, &mut state)?;
        Ok(state)
    }

    /// Advance a state through the epoch loop until exhaustion or stop.
    fn drive<F>(&mut self, process: &mut F, state: &mut RunState<B, O>) -> Result<()>
    where
        F: FnMut(&B) -> Result<O>,
    {
        let n_batches = state.batches.len();
        let mut offset = state.epoch_offset();
        let mut epoch = state.epochs_completed() + 1;

        state.running = true;
        self.emit(Event::Started, state)?;

        while state.running && epoch <= state.max_epoch {
            state.epoch = Some(epoch);
            self.emit(Event::EpochStarted, state)?;

            // A stop requested during EpochStarted skips the batch loop but
            // not the closing event for this epoch.
            if state.running {
                for index in offset..n_batches {
                    self.run_batch(process, state, index)?;
                    if !state.running {
                        break;
                    }
                }
            }
            offset = 0;

            state.batch = None;
            state.output = None;
            self.emit(Event::EpochFinished, state)?;
            epoch += 1;
        }

        state.epoch = None;
        state.running = false;
        self.emit(Event::Finished, state)?;
        Ok(())
    }

    /// Process one batch: `BatchStarted`, transforms, processor,
    /// `BatchFinished`.
    fn run_batch<F>(&mut self, process: &mut F, state: &mut RunState<B, O>, index: usize) -> Result<()>
    where
        F: FnMut(&B) -> Result<O>,
    {
        let batch = state.batches[index].clone();
        state.batch = Some(batch);
        self.emit(Event::BatchStarted, state)?;

        let output = match state.batch.as_ref() {
            Some(batch) => Some(process(batch)?),
            None => None,
        };
        state.output = output;

        // n_iters counts the batch being dispatched, so BatchFinished
        // handlers and resume arithmetic agree on how many are done.
        state.n_iters += 1;
        self.emit(Event::BatchFinished, state)?;
        Ok(())
    }

    /// Invoke each callback registered for `event`, in registration order.
    pub(crate) fn emit(&mut self, event: Event, state: &mut RunState<B, O>) -> Result<()> {
        for callback in &mut self.callbacks[event.index()] {
            match callback {
                Callback::State(f) => f(state)?,
                Callback::Transform(f) => {
                    if let Some(batch) = state.batch.take() {
                        state.batch = Some(f(batch)?);
                    }
                }
            }
        }
        Ok(())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Counts {
        epoch_started: usize,
        epoch_finished: usize,
        batch_started: usize,
        batch_finished: usize,
        started: usize,
        finished: usize,
    }

    fn counting_runner(counts: &Rc<RefCell<Counts>>) -> Runner<i32, i32> {
        let mut runner: Runner<i32, i32> = Runner::new();
        for event in Event::ALL {
            let counts = counts.clone();
            runner.on(event, move |_| {
                let mut c = counts.borrow_mut();
                match event {
                    Event::Started => c.started += 1,
                    Event::EpochStarted => c.epoch_started += 1,
                    Event::BatchStarted => c.batch_started += 1,
                    Event::BatchFinished => c.batch_finished += 1,
                    Event::EpochFinished => c.epoch_finished += 1,
                    Event::Finished => c.finished += 1,
                }
                Ok(())
            });
        }
        runner
    }

    proptest! {
        /// Without a stop request, a run of M epochs over N batches emits
        /// M epoch pairs and M*N batch pairs, and ends with n_iters == M*N.
        #[test]
        fn full_run_emission_counts(
            max_epoch in 1usize..5,
            n_batches in 0usize..6,
        ) {
            let counts = Rc::new(RefCell::new(Counts::default()));
            let mut runner = counting_runner(&counts);

            let batches: Vec<i32> = (0..n_batches as i32).collect();
            let state = runner.run(|b| Ok(*b), batches, max_epoch).unwrap();

            let c = counts.borrow();
            prop_assert_eq!(c.started, 1);
            prop_assert_eq!(c.finished, 1);
            prop_assert_eq!(c.epoch_started, max_epoch);
            prop_assert_eq!(c.epoch_finished, max_epoch);
            prop_assert_eq!(c.batch_started, max_epoch * n_batches);
            prop_assert_eq!(c.batch_finished, max_epoch * n_batches);
            prop_assert_eq!(state.n_iters, max_epoch * n_batches);
        }

        /// Stopping at iteration k always balances the started/finished
        /// pairs and emits exactly one Finished.
        #[test]
        fn stop_keeps_events_balanced(
            max_epoch in 1usize..4,
            n_batches in 1usize..5,
            stop_at in 1usize..20,
        ) {
            let counts = Rc::new(RefCell::new(Counts::default()));
            let mut runner = counting_runner(&counts);
            runner.on(Event::BatchFinished, move |state| {
                if state.n_iters == stop_at {
                    state.request_stop();
                }
                Ok(())
            });

            let batches: Vec<i32> = (0..n_batches as i32).collect();
            let state = runner.run(|b| Ok(*b), batches, max_epoch).unwrap();

            let c = counts.borrow();
            prop_assert_eq!(c.started, 1);
            prop_assert_eq!(c.finished, 1);
            prop_assert_eq!(c.epoch_started, c.epoch_finished);
            prop_assert_eq!(c.batch_started, c.batch_finished);
            prop_assert_eq!(state.n_iters, c.batch_finished);
            prop_assert_eq!(state.n_iters, stop_at.min(max_epoch * n_batches));
        }

        /// Resuming an interrupted run processes every batch of every epoch
        /// exactly once overall.
        #[test]
        fn resume_covers_every_batch_once(
            max_epoch in 1usize..4,
            n_batches in 1usize..5,
            stop_at in 1usize..8,
        ) {
            let stop_at = stop_at.min(max_epoch * n_batches);
            let processed = Rc::new(RefCell::new(0usize));

            let mut first: Runner<i32, i32> = Runner::new();
            let p = processed.clone();
            first.on(Event::BatchFinished, move |state| {
                *p.borrow_mut() += 1;
                if state.n_iters == stop_at {
                    state.request_stop();
                }
                Ok(())
            });
            let batches: Vec<i32> = (0..n_batches as i32).collect();
            let interrupted = first.run(|b| Ok(*b), batches, max_epoch).unwrap();

            let mut second: Runner<i32, i32> = Runner::new();
            let p = processed.clone();
            second.on(Event::BatchFinished, move |_| {
                *p.borrow_mut() += 1;
                Ok(())
            });
            let state = second.resume(|b| Ok(*b), interrupted).unwrap();

            prop_assert_eq!(*processed.borrow(), max_epoch * n_batches);
            prop_assert_eq!(state.n_iters, max_epoch * n_batches);
        }
    }
}
