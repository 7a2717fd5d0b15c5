//! Types that mirror the telemetry bridge's JSON. Only the fields the overlay
//! reads are declared; everything is optional on the wire.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModsInfo {
    /// Concatenated acronyms, e.g. "HDHR".
    pub name: String,
    pub rate: f64,
}

impl Default for ModsInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            rate: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PlayInfo {
    pub mode: Named,
    pub mods: ModsInfo,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OdStat {
    pub original: f64,
    pub converted: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BeatmapStats {
    pub od: OdStat,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct BeatmapTime {
    pub first_object: f64,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BeatmapInfo {
    pub mode: Named,
    pub stats: BeatmapStats,
    pub time: BeatmapTime,
}

/// Gameplay state record from the state feed.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GameStateUpdate {
    pub state: Named,
    pub play: PlayInfo,
    pub beatmap: BeatmapInfo,
}

impl GameStateUpdate {
    /// Mode of the current play, falling back to the beatmap's mode.
    pub fn mode_name(&self) -> &str {
        if self.play.mode.name.is_empty() {
            &self.beatmap.mode.name
        } else {
            &self.play.mode.name
        }
    }
}

/// Precise-timing record: the whole hit error stream of the current play.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PreciseUpdate {
    pub hit_errors: Vec<f64>,
    pub current_time: f64,
}

/// Envelope on the commands feed.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CommandMessage {
    pub command: String,
    pub message: Value,
}
