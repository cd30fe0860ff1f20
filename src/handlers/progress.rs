//! Progress display handler

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;

use crate::event::Event;
use crate::runner::Runner;
use crate::state::RunState;

use super::attachment::Attachment;

/// Rendering surface for per-epoch progress.
///
/// The [`ProgressBar`] attachment drives one of these: `begin` at the start
/// of every epoch with the number of batches, `update` after every batch,
/// `finish` when the epoch closes. `show_stats` receives the metrics
/// selected for display and defaults to doing nothing.
pub trait ProgressDisplay {
    fn begin(&mut self, total: usize);
    fn update(&mut self, n: usize);
    fn show_stats(&mut self, _stats: &BTreeMap<String, f64>) {}
    fn finish(&mut self);
}

/// Progress display that rewrites a single stderr line.
#[derive(Debug, Default)]
pub struct ConsoleProgress {
    count: usize,
    total: usize,
    stats_line: String,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(&self) {
        eprint!("\r{}/{}{}", self.count, self.total, self.stats_line);
        std::io::stderr().flush().ok();
    }
}

impl ProgressDisplay for ConsoleProgress {
    fn begin(&mut self, total: usize) {
        self.count = 0;
        self.total = total;
        self.stats_line.clear();
        self.render();
    }

    fn update(&mut self, n: usize) {
        self.count += n;
        self.render();
    }

    fn show_stats(&mut self, stats: &BTreeMap<String, f64>) {
        self.stats_line.clear();
        for (name, value) in stats {
            self.stats_line.push_str(&format!(" {name}={value:.4}"));
        }
    }

    fn finish(&mut self) {
        eprintln!();
    }
}

/// Displays a progress bar over the batches of each epoch.
///
/// Counts one unit per batch unless a size extractor is configured, in
/// which case each batch advances the bar by its extracted size. On a
/// resumed run the bar starts from the interrupted position.
///
/// # Example
///
/// ```
/// use corredor::Runner;
/// use corredor::handlers::ProgressBar;
///
/// let mut runner: Runner<i32, i32> = Runner::new();
/// runner.attach(ProgressBar::new().with_stats(["loss"]));
/// ```
pub struct ProgressBar<B: 'static, O: 'static> {
    display: Rc<RefCell<dyn ProgressDisplay>>,
    size_fn: Box<dyn Fn(&RunState<B, O>) -> usize>,
    stats: Vec<String>,
}

impl<B: 'static, O: 'static> ProgressBar<B, O> {
    /// Progress bar rendering to stderr.
    pub fn new() -> Self {
        Self::with_display(Rc::new(RefCell::new(ConsoleProgress::new())))
    }

    /// Progress bar driving the given display. Keeping a clone of the
    /// handle lets callers inspect the display after the run.
    pub fn with_display(display: Rc<RefCell<dyn ProgressDisplay>>) -> Self {
        Self {
            display,
            size_fn: Box::new(|_| 1),
            stats: Vec::new(),
        }
    }

    /// Advance the bar by a per-batch size instead of by 1.
    pub fn with_size(mut self, size_fn: impl Fn(&RunState<B, O>) -> usize + 'static) -> Self {
        self.size_fn = Box::new(size_fn);
        self
    }

    /// Show the named metrics next to the bar when they are present.
    pub fn with_stats<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stats = names.into_iter().map(Into::into).collect();
        self
    }
}

impl<B: 'static, O: 'static> Default for ProgressBar<B, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: 'static, O: 'static> Attachment<B, O> for ProgressBar<B, O> {
    fn attach_on(self, runner: &mut Runner<B, O>) {
        let ProgressBar {
            display,
            size_fn,
            stats,
        } = self;

        let on_epoch_started = display.clone();
        runner.on(Event::EpochStarted, move |state| {
            let mut display = on_epoch_started.borrow_mut();
            display.begin(state.batches.len());
            let offset = state.epoch_offset();
            if offset > 0 {
                display.update(offset);
            }
            Ok(())
        });

        let on_batch_finished = display.clone();
        runner.on(Event::BatchFinished, move |state| {
            let mut display = on_batch_finished.borrow_mut();
            if !stats.is_empty() {
                let selected: BTreeMap<String, f64> = stats
                    .iter()
                    .filter_map(|name| state.metric(name).map(|v| (name.clone(), v)))
                    .collect();
                display.show_stats(&selected);
            }
            display.update(size_fn(state));
            Ok(())
        });

        runner.on(Event::EpochFinished, move |_| {
            display.borrow_mut().finish();
            Ok(())
        });
    }
}
