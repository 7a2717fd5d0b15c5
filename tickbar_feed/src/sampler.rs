//! Gameplay simulator and the background task that publishes its snapshots.
//!
//! The simulator cycles menu -> play -> results. During play it advances a song
//! clock and appends a hit error every so often; everything random comes from
//! one seeded RNG so a fixed seed replays the same session.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::state::Publisher;
use crate::types::{
    BeatmapInfo, BeatmapStats, BeatmapTime, ModsInfo, Named, OdStat, PlayInfo, PrecisePayload,
    StatePayload,
};

const MENU_MS: f64 = 2000.0;
const RESULTS_MS: f64 = 3000.0;
/// Song time of the first hit object.
pub const FIRST_OBJECT_MS: f64 = 1500.0;
/// Song clock value when play starts (lead-in).
const LEAD_IN_MS: f64 = -1000.0;
const MODES: [&str; 4] = ["osu", "taiko", "fruits", "mania"];
const MOD_CHOICES: [(&str, f64); 5] = [
    ("", 1.0),
    ("HD", 1.0),
    ("HR", 1.0),
    ("EZ", 1.0),
    ("DT", 1.5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Menu,
    Play,
    Results,
}

impl Phase {
    pub fn state_name(self) -> &'static str {
        match self {
            Phase::Menu => "menu",
            Phase::Play => "play",
            Phase::Results => "resultScreen",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Chart {
    mode: &'static str,
    od: f64,
    mods: &'static str,
    rate: f64,
    /// Player's systematic offset (ms).
    bias: f64,
    spread: f64,
}

pub struct Simulator {
    rng: StdRng,
    play_ms: f64,
    phase: Phase,
    /// Wall time spent in the current phase (ms).
    in_phase: f64,
    chart: Chart,
    song_time: f64,
    next_hit: f64,
    hit_errors: Vec<f64>,
}

impl Simulator {
    pub fn new(seed: Option<u64>, play_secs: f64) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let chart = roll_chart(&mut rng);
        Self {
            rng,
            play_ms: play_secs * 1000.0,
            phase: Phase::Menu,
            in_phase: 0.0,
            chart,
            song_time: LEAD_IN_MS,
            next_hit: FIRST_OBJECT_MS,
            hit_errors: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn hit_errors(&self) -> &[f64] {
        &self.hit_errors
    }

    /// Move the simulation forward by `dt` of wall time.
    pub fn advance(&mut self, dt: Duration) {
        let dt_ms = dt.as_micros() as f64 / 1000.0;
        self.in_phase += dt_ms;
        match self.phase {
            Phase::Menu if self.in_phase >= MENU_MS => self.start_play(),
            Phase::Play => {
                self.song_time += dt_ms * self.chart.rate;
                while self.song_time >= self.next_hit {
                    let err = self.roll_error();
                    self.hit_errors.push(err);
                    self.next_hit += self.rng.gen_range(120.0..420.0);
                }
                if self.in_phase >= self.play_ms {
                    self.enter(Phase::Results);
                }
            }
            Phase::Results if self.in_phase >= RESULTS_MS => {
                self.chart = roll_chart(&mut self.rng);
                self.enter(Phase::Menu);
            }
            _ => {}
        }
    }

    pub fn state(&self) -> StatePayload {
        let c = &self.chart;
        StatePayload {
            state: Named::new(self.phase.state_name()),
            play: PlayInfo {
                mode: Named::new(c.mode),
                mods: ModsInfo {
                    name: c.mods.to_string(),
                    rate: c.rate,
                },
            },
            beatmap: BeatmapInfo {
                mode: Named::new(c.mode),
                stats: BeatmapStats {
                    od: OdStat {
                        original: c.od,
                        converted: c.od,
                    },
                },
                time: BeatmapTime {
                    first_object: FIRST_OBJECT_MS,
                },
            },
        }
    }

    /// Only meaningful while playing.
    pub fn precise(&self) -> Option<PrecisePayload> {
        (self.phase == Phase::Play).then(|| PrecisePayload {
            hit_errors: self.hit_errors.clone(),
            current_time: self.song_time,
        })
    }

    fn start_play(&mut self) {
        self.song_time = LEAD_IN_MS;
        self.next_hit = FIRST_OBJECT_MS;
        self.hit_errors.clear();
        self.enter(Phase::Play);
        info!(
            mode = self.chart.mode,
            od = self.chart.od,
            mods = self.chart.mods,
            "simulated play started"
        );
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "phase change");
        self.phase = phase;
        self.in_phase = 0.0;
    }

    /// Roughly normal error around the chart bias, in song time.
    fn roll_error(&mut self) -> f64 {
        if self.rng.gen_bool(0.02) {
            let side = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            return side * self.rng.gen_range(120.0..200.0) * self.chart.rate;
        }
        let sum: f64 = (0..4).map(|_| self.rng.gen::<f64>()).sum();
        let unit = (sum - 2.0) * 1.7;
        let err = self.chart.bias + unit * self.chart.spread;
        (err * 100.0).round() / 100.0 * self.chart.rate
    }
}

fn roll_chart(rng: &mut StdRng) -> Chart {
    let mode = MODES[rng.gen_range(0..MODES.len())];
    let (mods, rate) = MOD_CHOICES[rng.gen_range(0..MOD_CHOICES.len())];
    Chart {
        mode,
        od: (rng.gen_range(4.0..10.0_f64) * 10.0).round() / 10.0,
        mods,
        rate,
        bias: rng.gen_range(-12.0..12.0),
        spread: rng.gen_range(8.0..25.0),
    }
}

/// Drive `sim` every `period` and hand snapshots to the publisher.
pub fn spawn_sampler(mut sim: Simulator, publisher: Publisher, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        publisher.publish(&sim);
        loop {
            ticker.tick().await;
            sim.advance(period);
            publisher.publish(&sim);
        }
    })
}
