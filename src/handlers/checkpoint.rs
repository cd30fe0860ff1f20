//! Checkpointing handler
//!
//! Persists the run state at the end of epochs through a pluggable sink,
//! keeping at most a configured number of checkpoint files on disk. The
//! default sink writes JSON; [`load_state`] reads it back so a run can be
//! restored and [`resumed`](crate::runner::Runner::resume).

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::event::Event;
use crate::runner::Runner;
use crate::state::RunState;

use super::attachment::Attachment;
use super::improvement::Improvement;

/// Destination for serialized run states.
pub trait CheckpointSink<B, O> {
    /// Save the state to the given path.
    fn save(&mut self, state: &RunState<B, O>, path: &Path) -> Result<()>;
}

/// Sink that writes the run state as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl<B: Serialize, O: Serialize> CheckpointSink<B, O> for JsonSink {
    fn save(&mut self, state: &RunState<B, O>, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), state)?;
        Ok(())
    }
}

/// Read a run state previously written by [`JsonSink`].
pub fn load_state<B, O>(path: &Path) -> Result<RunState<B, O>>
where
    B: DeserializeOwned,
    O: DeserializeOwned,
{
    let file = File::open(path)?;
    let state = serde_json::from_reader(BufReader::new(file))?;
    Ok(state)
}

/// Saves checkpoints at the end of epochs, with bounded retention.
///
/// By default every epoch is saved. With
/// [`when_improves`](Checkpointer::when_improves) a checkpoint is written
/// only when the tracked metric improves on the best value seen so far.
/// When the number of saved files exceeds `max_saved`, the oldest is
/// deleted.
///
/// # Example
///
/// ```no_run
/// use corredor::Runner;
/// use corredor::handlers::{Checkpointer, Improvement};
///
/// let mut runner: Runner<i32, f64> = Runner::new();
/// runner.attach(
///     Checkpointer::new("checkpoints")
///         .max_saved(3)
///         .when_improves("loss", Improvement::min()),
/// );
/// ```
pub struct Checkpointer<B: 'static, O: 'static> {
    dir: PathBuf,
    max_saved: usize,
    monitored: Option<(String, Improvement)>,
    best: Option<f64>,
    sink: Box<dyn CheckpointSink<B, O>>,
    saved: VecDeque<PathBuf>,
    n_calls: usize,
}

impl<B: Serialize + 'static, O: Serialize + 'static> Checkpointer<B, O> {
    /// Checkpoint into `dir`, keeping a single most recent file.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_saved: 1,
            monitored: None,
            best: None,
            sink: Box::new(JsonSink),
            saved: VecDeque::new(),
            n_calls: 0,
        }
    }

    /// Keep up to `n` checkpoint files, deleting the oldest beyond that.
    pub fn max_saved(mut self, n: usize) -> Self {
        self.max_saved = n;
        self
    }

    /// Only save when `metric` improves according to `criterion`.
    pub fn when_improves(mut self, metric: impl Into<String>, criterion: Improvement) -> Self {
        self.monitored = Some((metric.into(), criterion));
        self
    }

    /// Replace the sink used to write checkpoints.
    pub fn with_sink(mut self, sink: impl CheckpointSink<B, O> + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    fn path_for(&self, n: usize) -> PathBuf {
        self.dir.join(format!("checkpoint_{n}.json"))
    }

    fn should_save(&mut self, state: &RunState<B, O>) -> Result<bool> {
        let Some((metric, criterion)) = &self.monitored else {
            return Ok(true);
        };
        let value = state.require_metric(metric)?;
        if criterion.is_improvement(value, self.best) {
            eprintln!("Found new best {metric} of {value}");
            self.best = Some(value);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn on_epoch_finished(&mut self, state: &RunState<B, O>) -> Result<()> {
        self.n_calls += 1;
        if self.should_save(state)? {
            std::fs::create_dir_all(&self.dir)?;
            let path = self.path_for(self.n_calls);
            self.sink.save(state, &path)?;
            self.saved.push_back(path);
        }
        while self.saved.len() > self.max_saved {
            if let Some(old) = self.saved.pop_front() {
                if old.exists() {
                    std::fs::remove_file(&old)?;
                }
            }
        }
        Ok(())
    }
}

impl<B: Serialize + 'static, O: Serialize + 'static> Attachment<B, O> for Checkpointer<B, O> {
    fn attach_on(self, runner: &mut Runner<B, O>) {
        let mut checkpointer = self;
        runner.on(Event::EpochFinished, move |state| {
            checkpointer.on_epoch_finished(state)
        });
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The number of files on disk never exceeds max_saved.
        #[test]
        fn retention_bound_holds(
            max_saved in 1usize..5,
            epochs in 1usize..10,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let mut runner: Runner<i32, i32> = Runner::new();
            runner.attach(Checkpointer::new(dir.path()).max_saved(max_saved));

            runner.run(|b| Ok(*b), vec![1], epochs).unwrap();

            let n_files = std::fs::read_dir(dir.path()).unwrap().count();
            prop_assert_eq!(n_files, max_saved.min(epochs));
        }
    }
}
