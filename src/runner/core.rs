//! Core `Runner` struct and callback registration

use crate::error::{Result, RunnerError};
use crate::event::Event;
use crate::handlers::Attachment;
use crate::state::RunState;

/// A state callback: runs at any lifecycle point with mutable access to the
/// shared run state.
pub type StateFn<B, O> = Box<dyn FnMut(&mut RunState<B, O>) -> Result<()>>;

/// A batch transform: receives the in-flight batch and returns its
/// replacement. Valid only on [`Event::BatchStarted`].
pub type TransformFn<B> = Box<dyn FnMut(B) -> Result<B>>;

/// A registered unit of callback code.
///
/// The two kinds form a closed set of typed callback interfaces: a plain
/// state callback is accepted on every event, while a batch transform is
/// only accepted on `BatchStarted`, where consecutive transforms chain into
/// a pipeline over the batch value ahead of the processor.
pub enum Callback<B: 'static, O: 'static> {
    /// Mutates or inspects the shared run state.
    State(StateFn<B, O>),
    /// Replaces the in-flight batch; each transform sees the output of the
    /// previous one.
    Transform(TransformFn<B>),
}

impl<B: 'static, O: 'static> Callback<B, O> {
    /// Wrap a state callback.
    pub fn state<F>(f: F) -> Self
    where
        F: FnMut(&mut RunState<B, O>) -> Result<()> + 'static,
    {
        Callback::State(Box::new(f))
    }

    /// Wrap a batch transform.
    pub fn transform<F>(f: F) -> Self
    where
        F: FnMut(B) -> Result<B> + 'static,
    {
        Callback::Transform(Box::new(f))
    }
}

/// An event-driven loop runner for iterating over batches across epochs.
///
/// The runner owns an ordered callback list per event. Registration order
/// is dispatch order, duplicates are allowed, and events nobody listens to
/// dispatch to nothing. The registry persists across runs, so handlers
/// attach once and the runner may run many times.
///
/// # Example
///
/// ```
/// use corredor::{Event, Runner};
///
/// let mut runner: Runner<i32, i32> = Runner::new();
/// runner
///     .on_batch_transform(|batch| Ok(batch + 1))
///     .on(Event::BatchFinished, |state| {
///         if let Some(output) = state.output {
///             state.insert_metric("last_output", f64::from(output));
///         }
///         Ok(())
///     });
///
/// let state = runner.run(|batch| Ok(batch * 10), vec![1, 2], 1)?;
/// assert_eq!(state.metric("last_output"), Some(30.0));
/// # Ok::<(), corredor::RunnerError>(())
/// ```
pub struct Runner<B: 'static, O: 'static> {
    pub(crate) callbacks: [Vec<Callback<B, O>>; Event::COUNT],
    pub(crate) repeat_interrupted_batch: bool,
}

impl<B: 'static, O: 'static> Runner<B, O> {
    /// Create a runner with an empty registry.
    pub fn new() -> Self {
        Self {
            callbacks: std::array::from_fn(|_| Vec::new()),
            repeat_interrupted_batch: false,
        }
    }

    /// Configure [`resume`](Runner::resume) to re-process the batch that was
    /// in flight when the interrupted run stopped. Off by default.
    pub fn repeat_interrupted_batch(mut self, repeat: bool) -> Self {
        self.repeat_interrupted_batch = repeat;
        self
    }

    /// Register a state callback for an event.
    ///
    /// Callbacks for an event are invoked in the order they are registered.
    pub fn on<F>(&mut self, event: Event, callback: F) -> &mut Self
    where
        F: FnMut(&mut RunState<B, O>) -> Result<()> + 'static,
    {
        self.callbacks[event.index()].push(Callback::state(callback));
        self
    }

    /// Register a batch transform on [`Event::BatchStarted`].
    ///
    /// Transforms chain in registration order: each receives the previous
    /// transform's output, and the processor receives the final result.
    pub fn on_batch_transform<F>(&mut self, transform: F) -> &mut Self
    where
        F: FnMut(B) -> Result<B> + 'static,
    {
        self.callbacks[Event::BatchStarted.index()].push(Callback::transform(transform));
        self
    }

    /// Append a callback to an event's list.
    ///
    /// Registering a [`Callback::Transform`] against any event other than
    /// `BatchStarted` is a contract violation and fails with
    /// [`RunnerError::CallbackMismatch`].
    pub fn register(&mut self, event: Event, callback: Callback<B, O>) -> Result<()> {
        if matches!(callback, Callback::Transform(_)) && event != Event::BatchStarted {
            return Err(RunnerError::CallbackMismatch {
                expected: Event::BatchStarted,
                got: event,
            });
        }
        self.callbacks[event.index()].push(callback);
        Ok(())
    }

    /// Append a sequence of callbacks in order.
    ///
    /// Equivalent to calling [`register`](Runner::register) once per
    /// callback; relative order is preserved. Fails on the first mismatched
    /// callback, leaving the earlier ones registered.
    pub fn register_many(&mut self, event: Event, callbacks: Vec<Callback<B, O>>) -> Result<()> {
        for callback in callbacks {
            self.register(event, callback)?;
        }
        Ok(())
    }

    /// Attach an external handler object.
    ///
    /// The attachment registers whichever events it cares about through the
    /// same registration operations; this is the sole extension point.
    pub fn attach(&mut self, attachment: impl Attachment<B, O>) -> &mut Self {
        attachment.attach_on(self);
        self
    }

    /// Number of callbacks currently registered for an event.
    pub fn callback_count(&self, event: Event) -> usize {
        self.callbacks[event.index()].len()
    }
}

impl<B: 'static, O: 'static> Default for Runner<B, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_runner_has_empty_registry() {
        let runner: Runner<i32, i32> = Runner::new();
        for event in Event::ALL {
            assert_eq!(runner.callback_count(event), 0);
        }
    }

    #[test]
    fn test_on_appends_in_order() {
        let mut runner: Runner<i32, i32> = Runner::new();
        runner.on(Event::Started, |_| Ok(()));
        runner.on(Event::Started, |_| Ok(()));
        assert_eq!(runner.callback_count(Event::Started), 2);
        assert_eq!(runner.callback_count(Event::Finished), 0);
    }

    #[test]
    fn test_register_rejects_misplaced_transform() {
        let mut runner: Runner<i32, i32> = Runner::new();
        let err = runner
            .register(Event::EpochFinished, Callback::transform(|b| Ok(b)))
            .unwrap_err();
        assert!(matches!(
            err,
            RunnerError::CallbackMismatch {
                expected: Event::BatchStarted,
                got: Event::EpochFinished,
            }
        ));
        assert_eq!(runner.callback_count(Event::EpochFinished), 0);
    }

    #[test]
    fn test_register_accepts_transform_on_batch_started() {
        let mut runner: Runner<i32, i32> = Runner::new();
        runner
            .register(Event::BatchStarted, Callback::transform(|b| Ok(b + 1)))
            .unwrap();
        assert_eq!(runner.callback_count(Event::BatchStarted), 1);
    }

    #[test]
    fn test_register_many_preserves_order_and_count() {
        let mut runner: Runner<i32, i32> = Runner::new();
        runner
            .register_many(
                Event::BatchStarted,
                vec![
                    Callback::state(|_| Ok(())),
                    Callback::transform(|b| Ok(b)),
                    Callback::state(|_| Ok(())),
                ],
            )
            .unwrap();
        assert_eq!(runner.callback_count(Event::BatchStarted), 3);
    }

    #[test]
    fn test_default() {
        let runner: Runner<i32, i32> = Runner::default();
        assert_eq!(runner.callback_count(Event::Started), 0);
        assert!(!runner.repeat_interrupted_batch);
    }
}
