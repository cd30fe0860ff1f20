//! Reducers: fold per-batch values into a per-epoch result
//!
//! The [`Reduce`] contract is independent of the event loop: `reset` once,
//! `update` once per value, `compute` the result. The reduction
//! attachments wire an implementation into a runner so that it resets on
//! `EpochStarted`, consumes one value per `BatchFinished`, and publishes
//! its result into the state metrics on `EpochFinished`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RunnerError;
use crate::event::Event;
use crate::runner::Runner;
use crate::state::RunState;

use super::attachment::Attachment;

/// Accumulates one value per batch and finalizes once per epoch.
pub trait Reduce<T> {
    /// Clear the accumulator.
    fn reset(&mut self);
    /// Fold one value in.
    fn update(&mut self, value: T);
    /// The result so far; `None` when no value has been seen.
    fn compute(&self) -> Option<T>;
}

/// Reduction by an arbitrary associative combine function.
///
/// # Example
///
/// ```
/// use corredor::handlers::{LambdaReducer, Reduce};
///
/// let mut product = LambdaReducer::new(|x: i64, y: i64| x * y);
/// for v in [4, 2, 1, 5, 6] {
///     product.update(v);
/// }
/// assert_eq!(product.compute(), Some(240));
/// ```
pub struct LambdaReducer<T: 'static> {
    combine: Box<dyn Fn(T, T) -> T>,
    acc: Option<T>,
}

impl<T: Clone + 'static> LambdaReducer<T> {
    pub fn new(combine: impl Fn(T, T) -> T + 'static) -> Self {
        Self {
            combine: Box::new(combine),
            acc: None,
        }
    }
}

impl<T: Clone + 'static> Reduce<T> for LambdaReducer<T> {
    fn reset(&mut self) {
        self.acc = None;
    }

    fn update(&mut self, value: T) {
        self.acc = Some(match self.acc.take() {
            None => value,
            Some(acc) => (self.combine)(acc, value),
        });
    }

    fn compute(&self) -> Option<T> {
        self.acc.clone()
    }
}

/// Sums values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumReducer {
    total: f64,
    seen: bool,
}

impl SumReducer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reduce<f64> for SumReducer {
    fn reset(&mut self) {
        self.total = 0.0;
        self.seen = false;
    }

    fn update(&mut self, value: f64) {
        self.total += value;
        self.seen = true;
    }

    fn compute(&self) -> Option<f64> {
        self.seen.then_some(self.total)
    }
}

/// Size-weighted mean of values.
///
/// Plain [`update`](Reduce::update) counts each value with size 1;
/// [`update_sized`](MeanReducer::update_sized) weights it. The divisor is
/// the sum of all sizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanReducer {
    sum: f64,
    total_size: f64,
}

impl MeanReducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in a value representing `size` underlying items.
    pub fn update_sized(&mut self, value: f64, size: f64) {
        self.sum += value;
        self.total_size += size;
    }
}

impl Reduce<f64> for MeanReducer {
    fn reset(&mut self) {
        self.sum = 0.0;
        self.total_size = 0.0;
    }

    fn update(&mut self, value: f64) {
        self.update_sized(value, 1.0);
    }

    fn compute(&self) -> Option<f64> {
        (self.total_size > 0.0).then(|| self.sum / self.total_size)
    }
}

type ValueFn<B, O> = Box<dyn Fn(&RunState<B, O>) -> Option<f64>>;

fn wire<B, O, R>(runner: &mut Runner<B, O>, name: String, reducer: R, value_fn: ValueFn<B, O>)
where
    B: 'static,
    O: 'static,
    R: Reduce<f64> + 'static,
{
    let reducer = Rc::new(RefCell::new(reducer));

    let on_epoch_started = reducer.clone();
    runner.on(Event::EpochStarted, move |_| {
        on_epoch_started.borrow_mut().reset();
        Ok(())
    });

    let on_batch_finished = reducer.clone();
    let value_name = name.clone();
    runner.on(Event::BatchFinished, move |state| {
        let value =
            value_fn(state).ok_or_else(|| RunnerError::MissingValue(value_name.clone()))?;
        on_batch_finished.borrow_mut().update(value);
        Ok(())
    });

    runner.on(Event::EpochFinished, move |state| {
        if let Some(result) = reducer.borrow().compute() {
            state.insert_metric(name.clone(), result);
        }
        Ok(())
    });
}

/// Attachment reducing a per-batch value with an arbitrary combine
/// function, published as a named metric at the end of each epoch.
///
/// # Example
///
/// ```
/// use corredor::Runner;
/// use corredor::handlers::LambdaReduction;
///
/// let mut runner: Runner<f64, f64> = Runner::new();
/// runner.attach(LambdaReduction::new(
///     "product",
///     |x, y| x * y,
///     |state| state.output,
/// ));
///
/// let state = runner.run(|b| Ok(*b), vec![4.0, 2.0, 1.0, 5.0, 6.0], 1)?;
/// assert_eq!(state.metric("product"), Some(240.0));
/// # Ok::<(), corredor::RunnerError>(())
/// ```
pub struct LambdaReduction<B: 'static, O: 'static> {
    name: String,
    combine: Box<dyn Fn(f64, f64) -> f64>,
    value_fn: ValueFn<B, O>,
}

impl<B: 'static, O: 'static> LambdaReduction<B, O> {
    pub fn new(
        name: impl Into<String>,
        combine: impl Fn(f64, f64) -> f64 + 'static,
        value_fn: impl Fn(&RunState<B, O>) -> Option<f64> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            combine: Box::new(combine),
            value_fn: Box::new(value_fn),
        }
    }
}

impl<B: 'static, O: 'static> Attachment<B, O> for LambdaReduction<B, O> {
    fn attach_on(self, runner: &mut Runner<B, O>) {
        wire(
            runner,
            self.name,
            LambdaReducer::new(self.combine),
            self.value_fn,
        );
    }
}

/// Attachment summing a per-batch value into a named epoch metric.
pub struct SumReduction<B: 'static, O: 'static> {
    name: String,
    value_fn: ValueFn<B, O>,
}

impl<B: 'static, O: 'static> SumReduction<B, O> {
    pub fn new(
        name: impl Into<String>,
        value_fn: impl Fn(&RunState<B, O>) -> Option<f64> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            value_fn: Box::new(value_fn),
        }
    }
}

impl<B: 'static, O: 'static> Attachment<B, O> for SumReduction<B, O> {
    fn attach_on(self, runner: &mut Runner<B, O>) {
        wire(runner, self.name, SumReducer::new(), self.value_fn);
    }
}

/// Attachment averaging a per-batch value into a named epoch metric,
/// optionally weighted by a per-batch size.
pub struct MeanReduction<B: 'static, O: 'static> {
    name: String,
    value_fn: ValueFn<B, O>,
    size_fn: Option<ValueFn<B, O>>,
}

impl<B: 'static, O: 'static> MeanReduction<B, O> {
    pub fn new(
        name: impl Into<String>,
        value_fn: impl Fn(&RunState<B, O>) -> Option<f64> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            value_fn: Box::new(value_fn),
            size_fn: None,
        }
    }

    /// Weight each batch by an extracted size instead of 1.
    pub fn with_size(mut self, size_fn: impl Fn(&RunState<B, O>) -> Option<f64> + 'static) -> Self {
        self.size_fn = Some(Box::new(size_fn));
        self
    }
}

impl<B: 'static, O: 'static> Attachment<B, O> for MeanReduction<B, O> {
    fn attach_on(self, runner: &mut Runner<B, O>) {
        let MeanReduction {
            name,
            value_fn,
            size_fn,
        } = self;
        let reducer = Rc::new(RefCell::new(MeanReducer::new()));

        let on_epoch_started = reducer.clone();
        runner.on(Event::EpochStarted, move |_| {
            on_epoch_started.borrow_mut().reset();
            Ok(())
        });

        let on_batch_finished = reducer.clone();
        let value_name = name.clone();
        runner.on(Event::BatchFinished, move |state| {
            let value =
                value_fn(state).ok_or_else(|| RunnerError::MissingValue(value_name.clone()))?;
            let size = match &size_fn {
                Some(size_fn) => size_fn(state)
                    .ok_or_else(|| RunnerError::MissingValue(value_name.clone()))?,
                None => 1.0,
            };
            on_batch_finished.borrow_mut().update_sized(value, size);
            Ok(())
        });

        runner.on(Event::EpochFinished, move |state| {
            if let Some(result) = reducer.borrow().compute() {
                state.insert_metric(name.clone(), result);
            }
            Ok(())
        });
    }
}
