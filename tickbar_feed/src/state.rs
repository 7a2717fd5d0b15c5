//! Shared feed state: latest serialized payloads behind watch channels.

use tokio::sync::watch;
use tracing::warn;

use crate::sampler::Simulator;

#[derive(Clone)]
pub struct AppState {
    pub state_json: watch::Receiver<String>,
    pub precise_json: watch::Receiver<String>,
}

/// Write side of [`AppState`], owned by the sampler task.
pub struct Publisher {
    state: watch::Sender<String>,
    precise: watch::Sender<String>,
}

pub fn channel() -> (Publisher, AppState) {
    let (state, state_json) = watch::channel(String::new());
    let (precise, precise_json) = watch::channel(String::new());
    (
        Publisher { state, precise },
        AppState {
            state_json,
            precise_json,
        },
    )
}

impl Publisher {
    pub fn publish(&self, sim: &Simulator) {
        match serde_json::to_string(&sim.state()) {
            // Subscribers only wake when the state payload actually changed
            Ok(js) => {
                self.state.send_if_modified(|cur| {
                    if *cur == js {
                        return false;
                    }
                    *cur = js;
                    true
                });
            }
            Err(e) => warn!(error = %e, "state payload not serializable"),
        }
        if let Some(p) = sim.precise() {
            match serde_json::to_string(&p) {
                Ok(js) => {
                    self.precise.send_replace(js);
                }
                Err(e) => warn!(error = %e, "precise payload not serializable"),
            }
        }
    }
}
