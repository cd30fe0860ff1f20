//! Attachment contract for external handler objects

use crate::runner::Runner;

/// An object that customizes a runner by registering callbacks.
///
/// Attaching is consuming: the handler moves its state into the closures it
/// registers. Handlers that listen to several events share that state
/// internally (dispatch is strictly sequential, so an `Rc<RefCell<..>>` is
/// enough).
///
/// # Example
///
/// ```
/// use corredor::{Event, Runner};
/// use corredor::handlers::Attachment;
///
/// struct BatchCounter;
///
/// impl<B: 'static, O: 'static> Attachment<B, O> for BatchCounter {
///     fn attach_on(self, runner: &mut Runner<B, O>) {
///         runner.on(Event::BatchFinished, |state| {
///             state.insert_metric("batches_done", state.n_iters as f64);
///             Ok(())
///         });
///     }
/// }
///
/// let mut runner: Runner<i32, i32> = Runner::new();
/// runner.attach(BatchCounter);
/// let state = runner.run(|b| Ok(*b), vec![1, 2, 3], 1)?;
/// assert_eq!(state.metric("batches_done"), Some(3.0));
/// # Ok::<(), corredor::RunnerError>(())
/// ```
pub trait Attachment<B: 'static, O: 'static> {
    /// Attach to a runner.
    fn attach_on(self, runner: &mut Runner<B, O>);
}
