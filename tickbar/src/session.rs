//! Session coordinator: turns telemetry into pool updates.
//!
//! The session is an owned value threaded through the app loop. It caches the
//! play parameters, recomputes timing windows when they change, and owns the
//! delayed reset that runs after leaving gameplay.
//!
//! A delayed reset is tagged with the epoch (count of play entries) that
//! scheduled it and is discarded if a new play started in the meantime.

use std::time::Instant;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::backend::{Frame, InlinePool, TickBackend};
use crate::config::{ConfigError, Settings};
use crate::pool::TickTiming;
use crate::timing::{thresholds_for, Gamemode, Mods, ThresholdTable};
use crate::types::{GameStateUpdate, PreciseUpdate};
use crate::worker::WorkerError;

const PLAY_STATE: &str = "play";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Idle,
    Playing,
}

/// What a state record did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Unchanged,
    Entered,
    Left,
    WindowsChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReset {
    pub epoch: u64,
    pub due: Instant,
}

pub struct Session {
    settings: Settings,
    backend: Box<dyn TickBackend>,
    state: GameState,
    state_name: String,
    mode: Gamemode,
    difficulty: f64,
    mods: Mods,
    rate: f64,
    windows: ThresholdTable,
    first_object_time: f64,
    is_reset: bool,
    visible: bool,
    hit_errors: Vec<f64>,
    epoch: u64,
    generation: u64,
    pending_reset: Option<PendingReset>,
    reset_notice: bool,
}

impl Session {
    pub fn new(settings: Settings, backend: Box<dyn TickBackend>) -> Self {
        let mods = Mods::default();
        let windows = thresholds_for(Gamemode::Osu, 0.0, &mods, &settings);
        Self {
            settings,
            backend,
            state: GameState::Idle,
            state_name: String::new(),
            mode: Gamemode::Osu,
            difficulty: 0.0,
            mods,
            rate: 1.0,
            windows,
            first_object_time: 0.0,
            is_reset: true,
            visible: false,
            hit_errors: Vec::new(),
            epoch: 0,
            generation: 0,
            pending_reset: None,
            reset_notice: false,
        }
    }

    /// Session with the pool updated on the caller's task.
    pub fn inline(settings: Settings) -> Self {
        let timing = TickTiming::from_settings(&settings);
        let windows = thresholds_for(Gamemode::Osu, 0.0, &Mods::default(), &settings);
        let backend = InlinePool::new(settings.pool_capacity, windows, timing);
        Self::new(settings, Box::new(backend))
    }

    pub fn on_state(
        &mut self,
        update: &GameStateUpdate,
        now: Instant,
    ) -> Result<SessionEvent, WorkerError> {
        let name = update.state.name.as_str();
        if name != self.state_name {
            self.state_name = name.to_string();
            if name == PLAY_STATE {
                self.enter_play(update)?;
                return Ok(SessionEvent::Entered);
            }
            if self.state == GameState::Playing {
                self.leave_play(now);
                return Ok(SessionEvent::Left);
            }
            return Ok(SessionEvent::Unchanged);
        }

        if self.state == GameState::Playing && self.capture_params(update) {
            self.windows = thresholds_for(self.mode, self.difficulty, &self.mods, &self.settings);
            info!(mode = %self.mode, od = self.difficulty, mods = %self.mods, "play parameters changed");
            self.backend.set_windows(&self.windows, self.timing())?;
            return Ok(SessionEvent::WindowsChanged);
        }
        Ok(SessionEvent::Unchanged)
    }

    /// Returns whether the frame changed.
    pub fn on_precise(&mut self, update: PreciseUpdate, now: Instant) -> Result<bool, WorkerError> {
        if self.state != GameState::Playing {
            return Ok(false);
        }
        if update.current_time < self.first_object_time {
            // Lead-in, or the map was restarted without leaving gameplay.
            if self.is_reset {
                return Ok(false);
            }
            self.full_reset()?;
            return Ok(true);
        }
        self.hit_errors = update.hit_errors;
        self.is_reset = false;
        self.backend.update(&self.hit_errors, self.rate, now)
    }

    /// Run due timers and age live ticks. Returns whether the frame changed.
    pub fn poll(&mut self, now: Instant) -> Result<bool, WorkerError> {
        let mut changed = false;
        if let Some(pending) = self.pending_reset {
            if now >= pending.due {
                self.pending_reset = None;
                if pending.epoch == self.epoch && self.state == GameState::Idle {
                    self.full_reset()?;
                    changed = true;
                } else {
                    debug!(epoch = pending.epoch, current = self.epoch, "discarding stale reset");
                }
            }
        }
        changed |= self.backend.update(&self.hit_errors, self.rate, now)?;
        Ok(changed)
    }

    /// Apply a settings patch from the commands feed.
    pub fn on_settings(&mut self, patch: &Value) -> Result<bool, SessionSettingsError> {
        let before = self.settings.pool_capacity;
        if !self.settings.apply_patch(patch)? {
            return Ok(false);
        }
        self.windows = thresholds_for(self.mode, self.difficulty, &self.mods, &self.settings);
        if self.settings.pool_capacity != before {
            info!(capacity = self.settings.pool_capacity, "pool capacity changed");
            if self.state == GameState::Playing {
                // Hits already in the stream have been shown; only new ones
                // go into the rebuilt pool.
                self.rebuild_pool(self.hit_errors.len())?;
            } else {
                self.full_reset()?;
            }
        } else {
            self.backend.set_windows(&self.windows, self.timing())?;
        }
        Ok(true)
    }

    pub fn frame(&self) -> &Frame {
        self.backend.frame()
    }

    pub fn windows(&self) -> &ThresholdTable {
        &self.windows
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn state_name(&self) -> &str {
        &self.state_name
    }

    pub fn mode(&self) -> Gamemode {
        self.mode
    }

    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    pub fn mods(&self) -> &Mods {
        &self.mods
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_reset(&self) -> Option<PendingReset> {
        self.pending_reset
    }

    /// True once after each full reset.
    pub fn take_reset_notice(&mut self) -> bool {
        std::mem::take(&mut self.reset_notice)
    }

    fn timing(&self) -> TickTiming {
        TickTiming::from_settings(&self.settings)
    }

    fn enter_play(&mut self, update: &GameStateUpdate) -> Result<(), WorkerError> {
        self.capture_params(update);
        self.first_object_time = update.beatmap.time.first_object;
        self.windows = thresholds_for(self.mode, self.difficulty, &self.mods, &self.settings);
        self.epoch += 1;
        self.pending_reset = None;
        self.state = GameState::Playing;
        self.full_reset()?;
        self.visible = true;
        info!(
            mode = %self.mode,
            od = self.difficulty,
            mods = %self.mods,
            rate = self.rate,
            epoch = self.epoch,
            "entered play"
        );
        Ok(())
    }

    fn leave_play(&mut self, now: Instant) {
        self.state = GameState::Idle;
        self.visible = false;
        let due = now
            .checked_add(self.settings.fade_out_duration())
            .unwrap_or(now);
        self.pending_reset = Some(PendingReset {
            epoch: self.epoch,
            due,
        });
        info!(state = self.state_name.as_str(), epoch = self.epoch, "left play");
    }

    /// Store mode/OD/mods/rate from a record; returns whether any differed.
    fn capture_params(&mut self, update: &GameStateUpdate) -> bool {
        let mode = Gamemode::parse(update.mode_name());
        let difficulty = update.beatmap.stats.od.original;
        let mods = Mods::parse(&update.play.mods.name);
        let rate = match update.play.mods.rate {
            r if r.is_finite() && r > 0.0 => r,
            _ => 1.0,
        };
        let changed = mode != self.mode
            || difficulty.to_bits() != self.difficulty.to_bits()
            || mods != self.mods
            || rate.to_bits() != self.rate.to_bits();
        self.mode = mode;
        self.difficulty = difficulty;
        self.mods = mods;
        self.rate = rate;
        changed
    }

    fn full_reset(&mut self) -> Result<(), WorkerError> {
        self.hit_errors.clear();
        self.is_reset = true;
        self.rebuild_pool(0)
    }

    /// New generation with an empty pool that resumes the stream at `start`.
    fn rebuild_pool(&mut self, start: usize) -> Result<(), WorkerError> {
        self.generation += 1;
        self.reset_notice = true;
        let timing = self.timing();
        self.backend.reset(
            self.generation,
            self.settings.pool_capacity,
            start,
            &self.windows,
            timing,
        )?;
        debug!(generation = self.generation, start, "pool reset");
        Ok(())
    }
}

/// Failure while applying a settings patch.
#[derive(Debug, Error)]
pub enum SessionSettingsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}
