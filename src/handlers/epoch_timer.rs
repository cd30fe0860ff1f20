//! Epoch timing handler

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::event::Event;
use crate::runner::Runner;

use super::attachment::Attachment;

/// Measures elapsed wall time between `start` and `end`.
pub trait Timer {
    fn start(&mut self);
    fn end(&mut self) -> Duration;
}

/// Monotonic-clock timer.
#[derive(Debug, Clone)]
pub struct SystemTimer {
    started_at: Instant,
}

impl SystemTimer {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }
}

impl Default for SystemTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for SystemTimer {
    fn start(&mut self) {
        self.started_at = Instant::now();
    }

    fn end(&mut self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Logs how long each epoch takes.
///
/// Epochs are only timed when `max_epoch` is greater than 1. On a resumed
/// run, the first message for the interrupted epoch says "Resuming" instead
/// of "Starting".
///
/// # Example
///
/// ```
/// use corredor::Runner;
/// use corredor::handlers::EpochTimer;
///
/// let mut runner: Runner<i32, i32> = Runner::new();
/// runner.attach(EpochTimer::new());
/// ```
pub struct EpochTimer {
    timer: Box<dyn Timer>,
    log: Box<dyn FnMut(&str)>,
}

impl EpochTimer {
    pub fn new() -> Self {
        Self {
            timer: Box::new(SystemTimer::new()),
            log: Box::new(|msg| eprintln!("{msg}")),
        }
    }

    /// Replace the wall-time source.
    pub fn with_timer(mut self, timer: impl Timer + 'static) -> Self {
        self.timer = Box::new(timer);
        self
    }

    /// Redirect log messages, e.g. into a buffer under test.
    pub fn with_logger(mut self, log: impl FnMut(&str) + 'static) -> Self {
        self.log = Box::new(log);
        self
    }
}

impl Default for EpochTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: 'static, O: 'static> Attachment<B, O> for EpochTimer {
    fn attach_on(self, runner: &mut Runner<B, O>) {
        let shared = Rc::new(RefCell::new(self));

        let on_start = shared.clone();
        runner.on(Event::EpochStarted, move |state| {
            if state.max_epoch > 1 {
                if let Some(epoch) = state.epoch {
                    let mut this = on_start.borrow_mut();
                    this.timer.start();
                    let verb = if state.epoch_offset() > 0 {
                        "Resuming"
                    } else {
                        "Starting"
                    };
                    let msg = format!("{verb} epoch {epoch}/{}", state.max_epoch);
                    (this.log)(&msg);
                }
            }
            Ok(())
        });

        runner.on(Event::EpochFinished, move |state| {
            if state.max_epoch > 1 {
                if let Some(epoch) = state.epoch {
                    let mut this = shared.borrow_mut();
                    let elapsed = this.timer.end();
                    let msg =
                        format!("Epoch {epoch}/{} done in {elapsed:.2?}", state.max_epoch);
                    (this.log)(&msg);
                }
            }
            Ok(())
        });
    }
}
