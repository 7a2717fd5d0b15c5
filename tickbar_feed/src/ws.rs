//! WebSocket upgrade and per-connection handlers for the three endpoints.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::state::AppState;

pub const STATE_PATH: &str = "/websocket/v2";
pub const PRECISE_PATH: &str = "/websocket/v2/precise";
pub const COMMANDS_PATH: &str = "/websocket/commands";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(STATE_PATH, get(state_handler))
        .route(PRECISE_PATH, get(precise_handler))
        .route(COMMANDS_PATH, get(commands_handler))
        .with_state(state)
}

async fn state_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| push_socket(socket, state.state_json, "state"))
}

async fn precise_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| push_socket(socket, state.precise_json, "precise"))
}

async fn commands_handler(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(commands_socket)
}

/// Send the current payload and every later change until the client leaves.
async fn push_socket(mut socket: WebSocket, mut rx: watch::Receiver<String>, label: &'static str) {
    info!(endpoint = label, "client connected");
    rx.mark_changed();
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let js = rx.borrow_and_update().clone();
                if js.is_empty() {
                    continue;
                }
                if socket.send(Message::Text(js)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    // Filters are accepted but every payload is already minimal
                    debug!(endpoint = label, %text, "client command");
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    info!(endpoint = label, "client disconnected");
}

async fn commands_socket(mut socket: WebSocket) {
    info!(endpoint = "commands", "client connected");
    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let Some((command, arg)) = text.split_once(':') else {
                    continue;
                };
                debug!(command, arg, "client command");
                if command == "getSettings" {
                    let reply = json!({ "command": "getSettings", "message": {} });
                    if socket.send(Message::Text(reply.to_string())).await.is_err() {
                        break;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    info!(endpoint = "commands", "client disconnected");
}
