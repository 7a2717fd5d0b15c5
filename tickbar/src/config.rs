//! Overlay settings: a flat JSON object loaded from disk and patched live by the
//! commands feed.
//! Stored under XDG config dir: $XDG_CONFIG_HOME/tickbar/settings.json (fallback ~/.config/tickbar/settings.json)

use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings patch must be a JSON object")]
    NotAnObject,
    #[error("invalid settings value: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("settings file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// How long a tick stays fully visible (ms).
    pub tick_duration_ms: f64,
    /// Fade after the visible phase, and the delay before a full reset (ms).
    pub fade_out_duration_ms: f64,
    pub pool_capacity: usize,
    /// Display units per millisecond of hit error.
    pub scale: f64,
    /// |median| at or below this is drawn as "perfect" (ms).
    pub perfect_arrow_threshold: f64,
    pub use_custom_timing_windows: bool,
    pub custom_timing_windows: String,
    pub show_sd: bool,
    /// Run the tick pool on a separate task.
    pub offload_pool: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tick_duration_ms: 500.0,
            fade_out_duration_ms: 800.0,
            pool_capacity: 100,
            scale: 2.0,
            perfect_arrow_threshold: 5.0,
            use_custom_timing_windows: false,
            custom_timing_windows: "16.5,64,97,127,151".into(),
            show_sd: true,
            offload_pool: false,
        }
    }
}

impl Settings {
    pub fn tick_duration(&self) -> Duration {
        millis(self.tick_duration_ms)
    }

    pub fn fade_out_duration(&self) -> Duration {
        millis(self.fade_out_duration_ms)
    }

    /// Merge a partial settings object. Keys may use either the snake_case
    /// names above or the overlay's camelCase names; unknown keys are ignored.
    /// On error the settings are left untouched. Returns whether anything changed.
    pub fn apply_patch(&mut self, patch: &Value) -> Result<bool, ConfigError> {
        let Value::Object(incoming) = patch else {
            return Err(ConfigError::NotAnObject);
        };
        let Value::Object(mut current) = serde_json::to_value(&*self)? else {
            return Err(ConfigError::NotAnObject);
        };
        let mut touched = Map::new();
        for (key, value) in incoming {
            match canonical_key(key) {
                Some(k) => {
                    touched.insert(k.to_string(), value.clone());
                }
                None if key == HOST_KEY => {}
                None => debug!(key = key.as_str(), "ignoring unknown setting"),
            }
        }
        current.extend(touched);
        let next: Settings = serde_json::from_value(Value::Object(current))?;
        let changed = next != *self;
        *self = next;
        Ok(changed)
    }
}

/// Longest tick, fade or reset delay a setting can ask for.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Settings key the commands feed uses to point the overlay at another bridge.
pub const HOST_KEY: &str = "websocketUrl";

fn millis(ms: f64) -> Duration {
    if !(ms.is_finite() && ms > 0.0) {
        return Duration::ZERO;
    }
    match Duration::try_from_secs_f64(ms / 1000.0) {
        Ok(d) if d <= MAX_DURATION => d,
        _ => {
            warn!(ms, "duration setting out of range, clamping");
            MAX_DURATION
        }
    }
}

/// Bridge host requested by a settings object, if any.
pub fn requested_host(patch: &Value) -> Option<&str> {
    patch
        .get(HOST_KEY)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|h| !h.is_empty())
}

fn canonical_key(key: &str) -> Option<&'static str> {
    Some(match key {
        "tick_duration_ms" | "tickDuration" => "tick_duration_ms",
        "fade_out_duration_ms" | "fadeOutDuration" => "fade_out_duration_ms",
        "pool_capacity" | "poolSize" => "pool_capacity",
        "scale" | "tickScale" => "scale",
        "perfect_arrow_threshold" | "perfectArrowThreshold" => "perfect_arrow_threshold",
        "use_custom_timing_windows" | "useCustomTimingWindows" => "use_custom_timing_windows",
        "custom_timing_windows" | "customTimingWindows" => "custom_timing_windows",
        "show_sd" | "showSD" => "show_sd",
        "offload_pool" | "offloadPool" => "offload_pool",
        _ => return None,
    })
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("tickbar")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tickbar")
    }
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

/// Read settings, falling back to defaults when the file is missing or bad.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return settings,
    };
    let parsed = serde_json::from_str::<Value>(&raw)
        .map_err(ConfigError::from)
        .and_then(|v| settings.apply_patch(&v));
    if let Err(e) = parsed {
        warn!(path = %path.display(), error = %e, "unreadable settings file, using defaults");
        return Settings::default();
    }
    settings
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(settings)?;
    fs::write(path, data)?;
    Ok(())
}
