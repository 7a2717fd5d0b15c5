//! Fixed-capacity tick pool.
//!
//! Every slot is allocated once and reused forever. Stream index `i` always
//! lands in slot `i % capacity`, so the pool only needs to remember how many
//! samples it has consumed to know which ones are new.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::Settings;
use crate::timing::{Grade, ThresholdTable};

/// Lifetime and display scale applied to every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickTiming {
    /// Fully visible phase.
    pub tick: Duration,
    /// Fading phase that follows; zero disables it.
    pub fade_out: Duration,
    /// Display units per millisecond.
    pub scale: f64,
}

impl TickTiming {
    pub fn from_settings(settings: &Settings) -> Self {
        let scale = if settings.scale.is_finite() && settings.scale > 0.0 {
            settings.scale
        } else {
            Self::default().scale
        };
        Self {
            tick: settings.tick_duration(),
            fade_out: settings.fade_out_duration(),
            scale,
        }
    }

    /// Age after which a tick is no longer live at all.
    pub fn lifetime(&self) -> Duration {
        self.tick.saturating_add(self.fade_out)
    }
}

impl Default for TickTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(500),
            fade_out: Duration::from_millis(800),
            scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPhase {
    #[default]
    Inactive,
    Active,
    Fading,
}

/// One pooled display record.
#[derive(Debug, Clone, Default)]
pub struct Tick {
    pub position: f64,
    pub grade: Option<Grade>,
    pub phase: TickPhase,
    /// When the slot last received a sample; `None` while inactive.
    pub assigned_at: Option<Instant>,
    /// Stream index of the sample the slot last received.
    pub sample_index: Option<usize>,
}

impl Tick {
    pub fn is_active(&self) -> bool {
        self.phase != TickPhase::Inactive
    }

    pub fn grade_label(&self) -> &'static str {
        match self.grade {
            Some(g) if self.is_active() => g.label(),
            _ => "inactive",
        }
    }

    fn assign(&mut self, index: usize, position: f64, grade: Grade, now: Instant) {
        self.position = position;
        self.grade = Some(grade);
        self.phase = TickPhase::Active;
        self.assigned_at = Some(now);
        self.sample_index = Some(index);
    }

    fn deactivate(&mut self) {
        self.position = 0.0;
        self.grade = None;
        self.phase = TickPhase::Inactive;
        self.assigned_at = None;
    }
}

/// What the render side sees for one slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickView {
    pub position: f64,
    pub grade: &'static str,
    pub active: bool,
    pub fading: bool,
}

impl From<&Tick> for TickView {
    fn from(t: &Tick) -> Self {
        Self {
            position: t.position,
            grade: t.grade_label(),
            active: t.is_active(),
            fading: t.phase == TickPhase::Fading,
        }
    }
}

/// Grade for a display position.
pub fn classify(position: f64, windows: &ThresholdTable, scale: f64) -> Grade {
    windows.classify(position / scale)
}

#[derive(Debug, Clone)]
pub struct TickPool {
    ticks: Vec<Tick>,
    processed: usize,
    live: usize,
}

impl TickPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            ticks: vec![Tick::default(); capacity.max(1)],
            processed: 0,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.ticks.len()
    }

    /// Stream entries consumed since the last reset.
    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn active_count(&self) -> usize {
        self.live
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn reset(&mut self) {
        self.reset_from(0);
    }

    /// Clear every slot and treat the first `start` stream entries as already
    /// consumed, so only later samples show up.
    pub fn reset_from(&mut self, start: usize) {
        for tick in &mut self.ticks {
            *tick = Tick::default();
        }
        self.processed = start;
        self.live = 0;
    }

    /// Age live ticks, then map every unseen stream entry into its slot.
    ///
    /// `sample_at(i)` returns the (rate-adjusted) hit error in ms for stream
    /// index `i`, for `processed <= i < stream_len`. A non-finite sample
    /// empties its slot, so a batch and the same samples fed one by one leave
    /// the same ticks. Returns whether any slot changed.
    pub fn update<F>(
        &mut self,
        stream_len: usize,
        sample_at: F,
        windows: &ThresholdTable,
        timing: &TickTiming,
        now: Instant,
    ) -> bool
    where
        F: Fn(usize) -> f64,
    {
        let mut changed = self.age(timing, now);

        if stream_len < self.processed {
            debug!(stream_len, processed = self.processed, "hit error stream shrank, resetting pool");
            self.reset();
            changed = true;
        }
        if stream_len == self.processed {
            return changed;
        }

        // Anything older than one full lap would be overwritten in this pass.
        let cap = self.ticks.len();
        let start = self.processed.max(stream_len.saturating_sub(cap));
        for i in start..stream_len {
            let error = sample_at(i);
            let tick = &mut self.ticks[i % cap];
            let newer = tick.sample_index.map_or(true, |prev| i > prev);
            if !error.is_finite() {
                debug!(index = i, "non-finite hit error, clearing slot");
                if tick.is_active() && newer {
                    tick.deactivate();
                    self.live -= 1;
                }
                tick.sample_index = Some(i);
                continue;
            }
            let position = error * timing.scale;
            let grade = classify(position, windows, timing.scale);
            if !tick.is_active() {
                tick.assign(i, position, grade, now);
                self.live += 1;
            } else if newer {
                tick.assign(i, position, grade, now);
            }
        }
        self.processed = stream_len;
        true
    }

    /// Convenience over a full sample slice.
    pub fn ingest(
        &mut self,
        samples: &[f64],
        windows: &ThresholdTable,
        timing: &TickTiming,
        now: Instant,
    ) -> bool {
        self.update(samples.len(), |i| samples[i], windows, timing, now)
    }

    /// Re-grade live ticks after the timing windows changed.
    pub fn regrade(&mut self, windows: &ThresholdTable, scale: f64) {
        for tick in self.ticks.iter_mut().filter(|t| t.is_active()) {
            tick.grade = Some(classify(tick.position, windows, scale));
        }
    }

    /// Move live ticks onto a new display scale.
    pub fn rescale(&mut self, from: f64, to: f64) {
        if from == to || from <= 0.0 {
            return;
        }
        for tick in self.ticks.iter_mut().filter(|t| t.is_active()) {
            tick.position = tick.position / from * to;
        }
    }

    /// Hit errors (ms) of every live tick, fading ones included.
    pub fn live_errors_into(&self, out: &mut Vec<f64>, scale: f64) {
        out.clear();
        out.extend(
            self.ticks
                .iter()
                .filter(|t| t.is_active())
                .map(|t| t.position / scale),
        );
    }

    pub fn snapshot_into(&self, out: &mut Vec<TickView>) {
        out.clear();
        out.extend(self.ticks.iter().map(TickView::from));
    }

    fn age(&mut self, timing: &TickTiming, now: Instant) -> bool {
        if self.live == 0 {
            return false;
        }
        let lifetime = timing.lifetime();
        let mut changed = false;
        for tick in &mut self.ticks {
            let Some(at) = tick.assigned_at else { continue };
            let age = now.saturating_duration_since(at);
            if age > lifetime {
                tick.deactivate();
                self.live -= 1;
                changed = true;
            } else if age > timing.tick && tick.phase == TickPhase::Active {
                tick.phase = TickPhase::Fading;
                changed = true;
            }
        }
        changed
    }
}
