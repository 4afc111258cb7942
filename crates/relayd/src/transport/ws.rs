// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §4.6.6/§4.7: the terminal WebSocket endpoint. One connection attaches to
//! exactly one `ManagedPty` — either a regular session (`sessionId + cwd +
//! hostname`) or a launcher (`launcherId + hostname`, created beforehand via
//! `POST /terminals/launcher`) — and streams its byte fan-out until the
//! client disconnects or the PTY exits.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::terminal::{launcher, ManagedPty};
use crate::transport::auth::validate_ws_auth;
use crate::transport::state::AppState;

const CLOSE_INVALID_HANDSHAKE: u16 = 4000;
const CLOSE_PTY_CREATE_FAILED: u16 = 4001;

#[derive(Debug, Deserialize)]
pub struct TerminalQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    cwd: Option<String>,
    hostname: Option<String>,
    #[serde(rename = "launcherId")]
    launcher_id: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InboundMessage {
    Input { data: String },
    Resize { cols: u16, rows: u16 },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundMessage {
    Output {
        data: String,
    },
    Attached {
        #[serde(rename = "ptyId")]
        pty_id: String,
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "multiplexerName")]
        multiplexer_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    Exit {
        code: Option<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        signal: Option<i32>,
    },
    LauncherComplete {
        #[serde(rename = "sessionId")]
        session_id: String,
        #[serde(rename = "ptyId")]
        pty_id: String,
        cwd: String,
    },
    Pong,
    Error {
        message: String,
    },
}

/// The handshake's query params, validated into exactly one of the two
/// shapes the endpoint accepts. Carrying already-unwrapped fields here means
/// `handle_session`/`handle_launcher` never need to re-derive an `Option`
/// that `ws_handler` already confirmed was present.
enum Route {
    Session { session_id: String, cwd: String },
    Launcher { launcher_id: String },
}

impl Route {
    fn resolve(query: &TerminalQuery) -> Option<Self> {
        if let Some(launcher_id) = &query.launcher_id {
            return Some(Route::Launcher { launcher_id: launcher_id.clone() });
        }
        match (&query.session_id, &query.cwd) {
            (Some(session_id), Some(cwd)) => {
                Some(Route::Session { session_id: session_id.clone(), cwd: cwd.clone() })
            }
            _ => None,
        }
    }
}

/// `GET /terminal?sessionId=&cwd=&hostname=` or `?launcherId=&hostname=`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<TerminalQuery>,
) -> impl IntoResponse {
    if let Some(expected) = state.auth_token.as_deref() {
        let authorized = query.token.as_deref().is_some_and(|t| validate_ws_auth(t, Some(expected)).is_ok());
        if !authorized {
            return ws.on_upgrade(|socket| close_immediately(socket, CLOSE_INVALID_HANDSHAKE, "unauthorized"));
        }
    }

    let hostname = query.hostname.clone();
    match Route::resolve(&query) {
        Some(Route::Launcher { launcher_id }) => {
            ws.on_upgrade(move |socket| handle_launcher(socket, state, launcher_id, hostname))
        }
        Some(Route::Session { session_id, cwd }) => {
            ws.on_upgrade(move |socket| handle_session(socket, state, session_id, cwd, hostname))
        }
        None => ws.on_upgrade(|socket| {
            close_immediately(socket, CLOSE_INVALID_HANDSHAKE, "sessionId+cwd or launcherId required")
        }),
    }
}

async fn close_immediately(mut socket: WebSocket, code: u16, reason: &str) {
    let _ = socket.send(Message::Close(Some(CloseFrame { code, reason: reason.to_owned().into() }))).await;
}

async fn handle_session(
    mut socket: WebSocket,
    state: Arc<AppState>,
    session_id: String,
    cwd: String,
    hostname: Option<String>,
) {
    let hostname = hostname.unwrap_or_else(|| state.config.effective_hostname());

    let attached = match state.terminals.get_or_create(&session_id, &cwd, &hostname, false).await {
        Ok(attached) => attached,
        Err(e) => {
            let _ = send_json(&mut socket, &OutboundMessage::Error { message: e.to_string() }).await;
            close_immediately(socket, CLOSE_PTY_CREATE_FAILED, "pty create failed").await;
            return;
        }
    };

    let pty = attached.pty;
    let attached_msg = OutboundMessage::Attached {
        pty_id: pty.pty_id.clone(),
        session_id: pty.session_id(),
        multiplexer_name: pty.multiplexer_name(),
        warning: pty.warning.clone(),
    };
    if send_json(&mut socket, &attached_msg).await.is_err() {
        return;
    }

    drive_pty_connection(socket, pty).await;
}

/// §4.7: the launcher must already exist (created via a prior
/// `POST /terminals/launcher`); an unknown `launcherId` is a handshake
/// failure, not an implicit create.
async fn handle_launcher(
    mut socket: WebSocket,
    state: Arc<AppState>,
    launcher_id: String,
    hostname: Option<String>,
) {
    let hostname = hostname.unwrap_or_else(|| state.config.effective_hostname());
    let placeholder_id = format!("launcher-{launcher_id}");

    let Some(pty) = state.terminals.find_by_session_id(&placeholder_id) else {
        close_immediately(socket, CLOSE_INVALID_HANDSHAKE, "unknown launcherId").await;
        return;
    };
    let Some(created) = state.terminals.take_launcher(&launcher_id) else {
        close_immediately(socket, CLOSE_INVALID_HANDSHAKE, "launcher already consumed").await;
        return;
    };

    let attached_msg = OutboundMessage::Attached {
        pty_id: pty.pty_id.clone(),
        session_id: placeholder_id.clone(),
        multiplexer_name: pty.multiplexer_name(),
        warning: None,
    };
    if send_json(&mut socket, &attached_msg).await.is_err() {
        return;
    }

    // Stream the picker PTY until the user's selection makes it exit.
    if !drive_until_exit(&mut socket, pty.clone()).await {
        return;
    }

    let Some(picked) = launcher::read_selection(&created) else {
        debug!("launcher {launcher_id}: picker exited without a selection");
        return;
    };
    let dir = launcher::resolve_directory(&picked).to_string_lossy().into_owned();

    match launcher::complete(&state.terminals, &placeholder_id, &dir, &hostname).await {
        Ok(outcome) => {
            let msg = OutboundMessage::LauncherComplete {
                session_id: outcome.session_id,
                pty_id: outcome.pty.pty.pty_id.clone(),
                cwd: outcome.cwd,
            };
            if send_json(&mut socket, &msg).await.is_err() {
                return;
            }
            drive_pty_connection(socket, outcome.pty.pty).await;
        }
        Err(e) => {
            warn!("launcher {launcher_id} reconciliation failed: {e}");
            let _ = send_json(
                &mut socket,
                &OutboundMessage::LauncherComplete { session_id: placeholder_id, pty_id: pty.pty_id.clone(), cwd: dir },
            )
            .await;
        }
    }
}

/// Replay-then-stream loop used while the picker PTY is still running.
/// Returns `true` once the PTY exits; `false` if the client disconnected
/// first, in which case the caller should not continue reconciliation.
async fn drive_until_exit(socket: &mut WebSocket, pty: Arc<ManagedPty>) -> bool {
    let (snapshot, mut output_rx) = pty.subscribe();
    if !snapshot.is_empty() && send_output(socket, &snapshot).await.is_err() {
        return false;
    }

    loop {
        tokio::select! {
            chunk = output_rx.recv() => {
                match chunk {
                    Ok(data) => {
                        if send_output(socket, &data).await.is_err() {
                            return false;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return true,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(InboundMessage::Input { data }) = serde_json::from_str(&text) {
                            pty.write_input(Bytes::from(data.into_bytes())).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return false,
                    _ => {}
                }
            }
        }
    }
}

async fn drive_pty_connection(mut socket: WebSocket, pty: Arc<ManagedPty>) {
    let (snapshot, mut output_rx) = pty.subscribe();
    if !snapshot.is_empty() && send_output(&mut socket, &snapshot).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            chunk = output_rx.recv() => {
                match chunk {
                    Ok(data) => {
                        if send_output(&mut socket, &data).await.is_err() {
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        let exit = pty.exit_status();
                        let msg = OutboundMessage::Exit { code: exit.and_then(|e| e.code), signal: exit.and_then(|e| e.signal) };
                        let _ = send_json(&mut socket, &msg).await;
                        return;
                    }
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if handle_inbound(&mut socket, &pty, &text).await.is_err() {
                            return;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("terminal ws client disconnected: pty {}", pty.pty_id);
                        return;
                    }
                    Some(Err(_)) => return,
                    _ => {}
                }
            }
        }
    }
}

async fn handle_inbound(socket: &mut WebSocket, pty: &Arc<ManagedPty>, text: &str) -> Result<(), ()> {
    match serde_json::from_str::<InboundMessage>(text) {
        Ok(InboundMessage::Input { data }) => {
            pty.write_input(Bytes::from(data.into_bytes())).await;
            Ok(())
        }
        Ok(InboundMessage::Resize { cols, rows }) => {
            let _ = pty.resize(cols, rows);
            Ok(())
        }
        Ok(InboundMessage::Ping) => send_json(socket, &OutboundMessage::Pong).await,
        Err(e) => {
            warn!("unrecognized terminal ws message: {e}");
            Ok(())
        }
    }
}

async fn send_output(socket: &mut WebSocket, data: &[u8]) -> Result<(), ()> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    send_json(socket, &OutboundMessage::Output { data: encoded }).await
}

async fn send_json(socket: &mut WebSocket, message: &OutboundMessage) -> Result<(), ()> {
    let Ok(text) = serde_json::to_string(message) else { return Err(()) };
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
