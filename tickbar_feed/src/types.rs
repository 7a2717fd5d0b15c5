//! Data types sent to the client over WebSocket.
//! Field names follow the bridge's JSON so the client decodes them unchanged.

use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Named {
    pub name: String,
}

impl Named {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ModsInfo {
    pub name: String,
    pub rate: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PlayInfo {
    pub mode: Named,
    pub mods: ModsInfo,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OdStat {
    pub original: f64,
    pub converted: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BeatmapStats {
    pub od: OdStat,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BeatmapTime {
    pub first_object: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BeatmapInfo {
    pub mode: Named,
    pub stats: BeatmapStats,
    pub time: BeatmapTime,
}

/// Payload of the state endpoint.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StatePayload {
    pub state: Named,
    pub play: PlayInfo,
    pub beatmap: BeatmapInfo,
}

/// Payload of the precise endpoint.
#[derive(Debug, Serialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PrecisePayload {
    pub hit_errors: Vec<f64>,
    pub current_time: f64,
}
