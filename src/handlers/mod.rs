//! Handler modules built on the runner's registration surface
//!
//! Every handler here is a downstream consumer of the event loop: it
//! implements [`Attachment`] and registers ordinary callbacks for the
//! events it cares about. The runner has no built-in knowledge of any of
//! them.
//!
//! - [`ProgressBar`] renders per-epoch progress through a pluggable
//!   [`ProgressDisplay`].
//! - [`EpochTimer`] logs epoch timing through a pluggable [`Timer`].
//! - [`EarlyStopper`] stops the run when a monitored metric plateaus.
//! - [`Checkpointer`] persists the run state through a [`CheckpointSink`]
//!   with bounded retention; [`load_state`] restores it for resumption.
//! - [`LambdaReduction`], [`SumReduction`], and [`MeanReduction`] fold a
//!   per-batch value into a per-epoch metric using the [`Reduce`]
//!   implementations.

mod attachment;
mod checkpoint;
mod early_stopping;
mod epoch_timer;
mod improvement;
mod progress;
mod reducer;

pub use attachment::Attachment;
pub use checkpoint::{load_state, CheckpointSink, Checkpointer, JsonSink};
pub use early_stopping::EarlyStopper;
pub use epoch_timer::{EpochTimer, SystemTimer, Timer};
pub use improvement::{Improvement, Mode};
pub use progress::{ConsoleProgress, ProgressBar, ProgressDisplay};
pub use reducer::{
    LambdaReducer, LambdaReduction, MeanReducer, MeanReduction, Reduce, SumReducer, SumReduction,
};
