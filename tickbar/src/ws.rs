//! WebSocket client for the telemetry bridge.
//!
//! One task per endpoint keeps a connection open, forwards decoded records on
//! a shared channel and reconnects with backoff when the link drops. A
//! reconnect is never treated as a session reset.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::types::{CommandMessage, GameStateUpdate, PreciseUpdate};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_HOST: &str = "127.0.0.1:24050";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("bad telemetry url: {0}")]
    Url(#[from] url::ParseError),
    #[error("websocket: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed telemetry: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bridge reported an error: {0}")]
    Remote(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    State,
    Precise,
    Commands,
}

impl Endpoint {
    pub const ALL: [Endpoint; 3] = [Endpoint::State, Endpoint::Precise, Endpoint::Commands];

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::State => "/websocket/v2",
            Endpoint::Precise => "/websocket/v2/precise",
            Endpoint::Commands => "/websocket/commands",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Endpoint::State => "state",
            Endpoint::Precise => "precise",
            Endpoint::Commands => "commands",
        }
    }

    /// Fields the bridge should limit its messages to.
    fn filters(self) -> Option<Value> {
        match self {
            Endpoint::State => Some(json!(["state", "play", "beatmap"])),
            Endpoint::Precise => Some(json!(["hitErrors", "currentTime"])),
            Endpoint::Commands => None,
        }
    }
}

#[derive(Debug)]
pub enum Telemetry {
    State(Box<GameStateUpdate>),
    Precise(PreciseUpdate),
    /// Partial settings object from the commands feed.
    Settings(Value),
    Link { endpoint: Endpoint, up: bool },
}

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let d = self.current;
        self.current = (self.current * 2).min(self.max);
        d
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(10))
    }
}

/// `host` may be `HOST:PORT` or a full `ws://` / `wss://` URL.
pub fn endpoint_url(host: &str, endpoint: Endpoint, counter_path: &str) -> Result<Url, TelemetryError> {
    let base = if host.contains("://") {
        host.to_string()
    } else {
        format!("ws://{host}")
    };
    let mut url = Url::parse(&base)?;
    url.set_path(endpoint.path());
    url.query_pairs_mut().clear().append_pair("l", counter_path);
    Ok(url)
}

// Connect to one bridge endpoint and return the WS stream
pub async fn connect(url: &Url) -> Result<WsStream, TelemetryError> {
    let (ws, _) = connect_async(url.as_str()).await?;
    Ok(ws)
}

/// Decode one text frame. `Ok(None)` means a well-formed message the overlay
/// has no use for.
pub fn decode(endpoint: Endpoint, text: &str) -> Result<Option<Telemetry>, TelemetryError> {
    let value: Value = serde_json::from_str(text)?;
    if let Some(err) = value.get("error") {
        let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(TelemetryError::Remote(msg));
    }
    Ok(match endpoint {
        Endpoint::State => Some(Telemetry::State(Box::new(serde_json::from_value(value)?))),
        Endpoint::Precise => Some(Telemetry::Precise(serde_json::from_value(value)?)),
        Endpoint::Commands => {
            let cmd: CommandMessage = serde_json::from_value(value)?;
            match cmd.command.as_str() {
                "getSettings" | "updateSettings" => Some(Telemetry::Settings(cmd.message)),
                other => {
                    debug!(command = other, "ignoring bridge command");
                    None
                }
            }
        }
    })
}

/// Handles for the per-endpoint tasks; dropping it does not stop them.
pub struct Subscription {
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub fn abort(&self) {
        for t in &self.tasks {
            t.abort();
        }
    }
}

/// Open all three feeds against `host`.
pub fn subscribe(host: &str, counter_path: &str) -> (Subscription, mpsc::Receiver<Telemetry>) {
    let (tx, rx) = mpsc::channel(256);
    (spawn_endpoints(host, counter_path, &tx), rx)
}

fn spawn_endpoints(host: &str, counter_path: &str, tx: &mpsc::Sender<Telemetry>) -> Subscription {
    let tasks = Endpoint::ALL
        .into_iter()
        .map(|endpoint| {
            tokio::spawn(run_endpoint(
                host.to_string(),
                endpoint,
                counter_path.to_string(),
                tx.clone(),
            ))
        })
        .collect();
    Subscription { tasks }
}

/// A subscription that can be moved to another bridge while the receiver
/// stays the same.
pub struct Feed {
    host: String,
    counter_path: String,
    tx: mpsc::Sender<Telemetry>,
    subscription: Subscription,
}

impl Feed {
    pub fn open(host: &str, counter_path: &str) -> (Self, mpsc::Receiver<Telemetry>) {
        let (tx, rx) = mpsc::channel(256);
        let subscription = spawn_endpoints(host, counter_path, &tx);
        let feed = Self {
            host: host.to_string(),
            counter_path: counter_path.to_string(),
            tx,
            subscription,
        };
        (feed, rx)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Reconnect every endpoint to `host`. Returns false when already there.
    pub fn switch_host(&mut self, host: &str) -> bool {
        if host == self.host {
            return false;
        }
        info!(from = self.host.as_str(), to = host, "switching telemetry bridge");
        self.subscription.abort();
        self.host = host.to_string();
        self.subscription = spawn_endpoints(&self.host, &self.counter_path, &self.tx);
        true
    }

    pub fn close(&self) {
        self.subscription.abort();
    }
}

async fn run_endpoint(host: String, endpoint: Endpoint, counter_path: String, tx: mpsc::Sender<Telemetry>) {
    let mut backoff = Backoff::default();
    loop {
        match stream_endpoint(&host, endpoint, &counter_path, &tx, &mut backoff).await {
            Ok(true) => info!(endpoint = endpoint.label(), "telemetry connection closed"),
            Ok(false) => {}
            Err(e) => warn!(endpoint = endpoint.label(), error = %e, "telemetry connection failed"),
        }
        if tx.is_closed() {
            break;
        }
        let _ = tx.send(Telemetry::Link { endpoint, up: false }).await;
        let delay = backoff.next_delay();
        debug!(endpoint = endpoint.label(), ?delay, "reconnecting");
        sleep(delay).await;
    }
}

/// Returns `Ok(true)` when the bridge closed the link, `Ok(false)` when the
/// receiving side went away.
async fn stream_endpoint(
    host: &str,
    endpoint: Endpoint,
    counter_path: &str,
    tx: &mpsc::Sender<Telemetry>,
    backoff: &mut Backoff,
) -> Result<bool, TelemetryError> {
    let url = endpoint_url(host, endpoint, counter_path)?;
    let mut ws = connect(&url).await?;
    backoff.reset();
    info!(%url, "telemetry connected");
    if tx.send(Telemetry::Link { endpoint, up: true }).await.is_err() {
        return Ok(false);
    }

    if let Some(filters) = endpoint.filters() {
        ws.send(Message::Text(format!("applyFilters:{filters}"))).await?;
    }
    if endpoint == Endpoint::Commands {
        let path: String = url::form_urlencoded::byte_serialize(counter_path.as_bytes()).collect();
        ws.send(Message::Text(format!("getSettings:{path}"))).await?;
    }

    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => match decode(endpoint, &text) {
                Ok(Some(t)) => {
                    if tx.send(t).await.is_err() {
                        return Ok(false);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(endpoint = endpoint.label(), error = %e, "skipping telemetry message"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(true)
}
