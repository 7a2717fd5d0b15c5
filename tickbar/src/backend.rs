//! Where the tick pool runs. `InlinePool` updates it on the caller's task;
//! `crate::worker::WorkerPool` moves it to a separate task.

use std::time::Instant;

use crate::pool::{TickPool, TickTiming, TickView};
use crate::stats::Statistics;
use crate::timing::ThresholdTable;
use crate::worker::WorkerError;

/// Everything the render side needs for one paint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Pool generation this frame was computed for.
    pub generation: u64,
    pub ticks: Vec<TickView>,
    pub stats: Statistics,
}

impl Frame {
    pub fn live_ticks(&self) -> usize {
        self.ticks.iter().filter(|t| t.active).count()
    }
}

pub trait TickBackend: Send {
    /// Clear the pool and start a new generation. Stream entries below
    /// `start` count as already consumed.
    fn reset(
        &mut self,
        generation: u64,
        capacity: usize,
        start: usize,
        windows: &ThresholdTable,
        timing: TickTiming,
    ) -> Result<(), WorkerError>;

    /// Swap the timing windows without clearing the pool.
    fn set_windows(&mut self, windows: &ThresholdTable, timing: TickTiming)
        -> Result<(), WorkerError>;

    /// Feed the full hit error stream (ms, as reported) and age live ticks.
    /// Returns whether the frame changed.
    fn update(&mut self, samples: &[f64], rate: f64, now: Instant) -> Result<bool, WorkerError>;

    fn frame(&self) -> &Frame;
}

/// Pool plus the state needed to turn it into frames. Shared by both backends.
#[derive(Debug, Clone)]
pub struct PoolEngine {
    pool: TickPool,
    windows: ThresholdTable,
    timing: TickTiming,
    errors: Vec<f64>,
    scratch: Vec<f64>,
}

impl PoolEngine {
    pub fn new(capacity: usize, windows: ThresholdTable, timing: TickTiming) -> Self {
        let pool = TickPool::new(capacity);
        let cap = pool.capacity();
        Self {
            pool,
            windows,
            timing,
            errors: Vec::with_capacity(cap),
            scratch: Vec::with_capacity(cap),
        }
    }

    pub fn pool(&self) -> &TickPool {
        &self.pool
    }

    pub fn reset(
        &mut self,
        capacity: usize,
        start: usize,
        windows: ThresholdTable,
        timing: TickTiming,
        frame: &mut Frame,
    ) {
        if capacity.max(1) != self.pool.capacity() {
            *self = Self::new(capacity, windows, timing);
        } else {
            self.windows = windows;
            self.timing = timing;
        }
        self.pool.reset_from(start);
        self.fill(frame);
    }

    pub fn set_windows(&mut self, windows: ThresholdTable, timing: TickTiming, frame: &mut Frame) {
        self.pool.rescale(self.timing.scale, timing.scale);
        self.windows = windows;
        self.timing = timing;
        self.pool.regrade(&self.windows, self.timing.scale);
        self.fill(frame);
    }

    /// Run one pool update and refresh `frame` if anything moved.
    pub fn step<F>(&mut self, stream_len: usize, sample_at: F, now: Instant, frame: &mut Frame) -> bool
    where
        F: Fn(usize) -> f64,
    {
        let changed = self
            .pool
            .update(stream_len, sample_at, &self.windows, &self.timing, now);
        if changed {
            self.fill(frame);
        }
        changed
    }

    fn fill(&mut self, frame: &mut Frame) {
        self.pool.snapshot_into(&mut frame.ticks);
        self.pool.live_errors_into(&mut self.errors, self.timing.scale);
        frame.stats = Statistics::compute(&self.errors, &mut self.scratch);
    }
}

/// Synchronous backend: the pool lives on the coordinator's task.
#[derive(Debug, Clone)]
pub struct InlinePool {
    engine: PoolEngine,
    frame: Frame,
}

impl InlinePool {
    pub fn new(capacity: usize, windows: ThresholdTable, timing: TickTiming) -> Self {
        let mut engine = PoolEngine::new(capacity, windows, timing);
        let mut frame = Frame::default();
        engine.fill(&mut frame);
        Self { engine, frame }
    }

    pub fn pool(&self) -> &TickPool {
        self.engine.pool()
    }
}

impl TickBackend for InlinePool {
    fn reset(
        &mut self,
        generation: u64,
        capacity: usize,
        start: usize,
        windows: &ThresholdTable,
        timing: TickTiming,
    ) -> Result<(), WorkerError> {
        self.engine
            .reset(capacity, start, windows.clone(), timing, &mut self.frame);
        self.frame.generation = generation;
        Ok(())
    }

    fn set_windows(
        &mut self,
        windows: &ThresholdTable,
        timing: TickTiming,
    ) -> Result<(), WorkerError> {
        self.engine
            .set_windows(windows.clone(), timing, &mut self.frame);
        Ok(())
    }

    fn update(&mut self, samples: &[f64], rate: f64, now: Instant) -> Result<bool, WorkerError> {
        Ok(self
            .engine
            .step(samples.len(), |i| samples[i] / rate, now, &mut self.frame))
    }

    fn frame(&self) -> &Frame {
        &self.frame
    }
}
