//! The event loop runner
//!
//! A [`Runner`] iterates over batches for a number of epochs and emits
//! lifecycle events at defined points. Behavior during a run is customized
//! by registering callbacks against events; the runner itself has no
//! built-in knowledge of any handler's behavior.
//!
//! # Example
//!
//! ```
//! use corredor::{Event, Runner};
//!
//! let mut runner: Runner<i32, i32> = Runner::new();
//! runner.on(Event::EpochFinished, |state| {
//!     if let Some(epoch) = state.epoch {
//!         println!("epoch {epoch} done after {} batches", state.n_iters);
//!     }
//!     Ok(())
//! });
//!
//! let state = runner.run(|batch| Ok(batch * 2), vec![3, 5], 2)?;
//! assert_eq!(state.n_iters, 4);
//! # Ok::<(), corredor::RunnerError>(())
//! ```

mod core;
mod run_loop;

pub use core::{Callback, Runner, StateFn, TransformFn};
