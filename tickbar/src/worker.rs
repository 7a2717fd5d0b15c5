//! Tick pool on its own task.
//!
//! The coordinator sends commands one way and never waits; the worker posts
//! back whole frames tagged with the generation they belong to. Frames from an
//! older generation can still arrive after a reset and are dropped on receipt.

use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::{Frame, PoolEngine, TickBackend};
use crate::pool::TickTiming;
use crate::timing::ThresholdTable;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("tick worker is gone")]
    Lost,
}

#[derive(Debug)]
pub enum WorkerCommand {
    Reset {
        generation: u64,
        capacity: usize,
        start: usize,
        windows: ThresholdTable,
        timing: TickTiming,
    },
    SetWindows {
        windows: ThresholdTable,
        timing: TickTiming,
    },
    /// `samples` continues the stream at `offset`.
    Update {
        generation: u64,
        offset: usize,
        samples: Vec<f64>,
        rate: f64,
        now: Instant,
    },
}

pub struct WorkerPool {
    tx: UnboundedSender<WorkerCommand>,
    rx: UnboundedReceiver<Frame>,
    task: JoinHandle<()>,
    generation: u64,
    /// Stream entries already handed to the worker.
    sent: usize,
    frame: Frame,
}

impl WorkerPool {
    /// Must be called from inside a tokio runtime.
    pub fn spawn(capacity: usize, windows: ThresholdTable, timing: TickTiming) -> Self {
        let (tx, cmd_rx) = mpsc::unbounded_channel();
        let (frame_tx, rx) = mpsc::unbounded_channel();
        let engine = PoolEngine::new(capacity, windows, timing);
        let task = tokio::spawn(run_worker(engine, cmd_rx, frame_tx));
        Self {
            tx,
            rx,
            task,
            generation: 0,
            sent: 0,
            frame: Frame::default(),
        }
    }

    /// Stop the worker task. Later calls report `WorkerError::Lost`.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Take whatever frames the worker has posted, keeping the newest one from
    /// the current generation. Returns whether the frame changed.
    pub fn drain(&mut self) -> Result<bool, WorkerError> {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(frame) if frame.generation == self.generation => {
                    self.frame = frame;
                    changed = true;
                }
                Ok(stale) => {
                    debug!(stale = stale.generation, current = self.generation, "dropping stale frame");
                }
                Err(TryRecvError::Empty) => return Ok(changed),
                Err(TryRecvError::Disconnected) => return Err(WorkerError::Lost),
            }
        }
    }

    fn send(&self, cmd: WorkerCommand) -> Result<(), WorkerError> {
        self.tx.send(cmd).map_err(|_| WorkerError::Lost)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TickBackend for WorkerPool {
    fn reset(
        &mut self,
        generation: u64,
        capacity: usize,
        start: usize,
        windows: &ThresholdTable,
        timing: TickTiming,
    ) -> Result<(), WorkerError> {
        self.generation = generation;
        self.sent = start;
        // Blank locally so nothing from the old generation is drawn meanwhile.
        self.frame = Frame {
            generation,
            ..Frame::default()
        };
        self.send(WorkerCommand::Reset {
            generation,
            capacity,
            start,
            windows: windows.clone(),
            timing,
        })
    }

    fn set_windows(
        &mut self,
        windows: &ThresholdTable,
        timing: TickTiming,
    ) -> Result<(), WorkerError> {
        self.send(WorkerCommand::SetWindows {
            windows: windows.clone(),
            timing,
        })
    }

    fn update(&mut self, samples: &[f64], rate: f64, now: Instant) -> Result<bool, WorkerError> {
        if samples.len() < self.sent {
            self.sent = 0;
        }
        self.send(WorkerCommand::Update {
            generation: self.generation,
            offset: self.sent,
            samples: samples[self.sent..].to_vec(),
            rate,
            now,
        })?;
        self.sent = samples.len();
        self.drain()
    }

    fn frame(&self) -> &Frame {
        &self.frame
    }
}

async fn run_worker(
    mut engine: PoolEngine,
    mut commands: UnboundedReceiver<WorkerCommand>,
    frames: UnboundedSender<Frame>,
) {
    let mut generation = 0;
    let mut stream: Vec<f64> = Vec::new();
    let mut frame = Frame::default();

    while let Some(cmd) = commands.recv().await {
        let post = match cmd {
            WorkerCommand::Reset {
                generation: g,
                capacity,
                start,
                windows,
                timing,
            } => {
                generation = g;
                // Entries below `start` are never read again; keep offsets aligned.
                stream.clear();
                stream.resize(start, f64::NAN);
                engine.reset(capacity, start, windows, timing, &mut frame);
                frame.generation = g;
                true
            }
            WorkerCommand::SetWindows { windows, timing } => {
                engine.set_windows(windows, timing, &mut frame);
                true
            }
            WorkerCommand::Update {
                generation: g,
                offset,
                samples,
                rate,
                now,
            } => {
                if g != generation {
                    continue;
                }
                if offset > stream.len() {
                    warn!(offset, have = stream.len(), "hit error delta skips ahead, ignoring");
                    continue;
                }
                stream.truncate(offset);
                stream.extend_from_slice(&samples);
                let mirror = &stream;
                engine.step(mirror.len(), |i| mirror[i] / rate, now, &mut frame)
            }
        };
        if post && frames.send(frame.clone()).is_err() {
            break;
        }
    }
    debug!("tick worker stopped");
}
