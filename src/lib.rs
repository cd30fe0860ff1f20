//! Event-driven loop runner for neural network training and evaluation
//!
//! A [`Runner`] provides a thin abstraction over iterating batches for
//! several epochs. It emits a fixed sequence of lifecycle [`Event`]s,
//! invokes registered callbacks in order, shares a mutable [`RunState`]
//! between them, and supports cooperative early stop that still honors the
//! pending finalization events. Cross-cutting behavior lives in handler
//! modules that attach through the same registration surface:
//! progress display, epoch timing, early stopping, checkpointing, and
//! per-epoch reductions.
//!
//! # Example
//!
//! ```
//! use corredor::{Event, Runner};
//! use corredor::handlers::{EarlyStopper, MeanReduction};
//!
//! let mut runner: Runner<f64, f64> = Runner::new();
//!
//! // Average the per-batch outputs into a "loss" metric each epoch, and
//! // stop once it plateaus for more than two epochs.
//! runner.attach(MeanReduction::new("loss", |state| state.output));
//! runner.attach(EarlyStopper::new("loss", 2));
//!
//! let state = runner.run(|batch| Ok(batch * 0.5), vec![1.0, 2.0, 3.0], 20)?;
//! assert_eq!(state.metric("loss"), Some(1.0));
//! assert!(!state.running);
//! # Ok::<(), corredor::RunnerError>(())
//! ```
//!
//! Execution is single-threaded, synchronous, and cooperative: events fire
//! in catalog order, callbacks for one event fire in strict registration
//! order, and a stop request never interrupts a callback that is already
//! executing.

pub mod error;
pub mod event;
pub mod handlers;
pub mod runner;
pub mod state;

pub use error::{Result, RunnerError};
pub use event::Event;
pub use runner::{Callback, Runner};
pub use state::RunState;
