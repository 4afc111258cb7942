// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §6 HTTP facade: host-terminal focus/open, remote mounts, and the
//! terminal-lifecycle endpoints backing the `/terminal` WebSocket.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::mounts::MachineInfo;
use crate::terminal::ManagedPty;
use crate::transport::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FocusItermRequest {
    #[serde(rename = "searchTerm")]
    search_term: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    success: bool,
}

/// `POST /focus-iterm`.
pub async fn focus_iterm(State(state): State<Arc<AppState>>, Json(req): Json<FocusItermRequest>) -> impl IntoResponse {
    let success = state.host_terminal.focus(req.search_term.as_deref()).await;
    Json(SuccessResponse { success })
}

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    cwd: String,
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// `POST /open-session`: ensure the session's multiplexer exists, then open
/// a host terminal tab attached to it.
pub async fn open_session(State(state): State<Arc<AppState>>, Json(req): Json<OpenSessionRequest>) -> impl IntoResponse {
    let hostname = state.config.effective_hostname();
    let success = match state.terminals.get_or_create(&req.session_id, &req.cwd, &hostname, false).await {
        Ok(attached) => {
            let command = format!("tmux attach -t {}", attached.pty.multiplexer_name());
            state.host_terminal.open(&req.cwd, &command).await
        }
        Err(_) => false,
    };
    Json(SuccessResponse { success })
}

#[derive(Debug, Deserialize)]
pub struct FocusOrOpenRequest {
    cwd: String,
    #[serde(rename = "sessionId")]
    session_id: String,
    #[allow(dead_code)]
    status: Option<String>,
    #[serde(rename = "lastAgentMessage")]
    #[allow(dead_code)]
    last_agent_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FocusOrOpenResponse {
    action: &'static str,
}

/// `POST /focus-or-open`: try to focus an existing host terminal window
/// matching the session, falling back to opening a new one.
pub async fn focus_or_open(State(state): State<Arc<AppState>>, Json(req): Json<FocusOrOpenRequest>) -> impl IntoResponse {
    if state.host_terminal.focus(Some(&req.session_id)).await {
        return Json(FocusOrOpenResponse { action: "focused" });
    }

    let hostname = state.config.effective_hostname();
    let opened = match state.terminals.get_or_create(&req.session_id, &req.cwd, &hostname, false).await {
        Ok(attached) => {
            let command = format!("tmux attach -t {}", attached.pty.multiplexer_name());
            state.host_terminal.open(&req.cwd, &command).await
        }
        Err(_) => false,
    };

    Json(FocusOrOpenResponse { action: if opened { "opened" } else { "failed" } })
}

#[derive(Debug, Serialize)]
pub struct MachinesResponse {
    machines: Vec<MachineInfo>,
}

/// `GET /machines`.
pub async fn list_machines(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(MachinesResponse { machines: state.mounts.machines() })
}

#[derive(Debug, Serialize)]
pub struct TerminalInfo {
    #[serde(rename = "ptyId")]
    pty_id: String,
    #[serde(rename = "sessionId")]
    session_id: String,
    cwd: String,
    hostname: String,
    #[serde(rename = "createdAt")]
    created_at: i64,
    #[serde(rename = "lastActivityAt")]
    last_activity_at: i64,
    #[serde(rename = "multiplexerName")]
    multiplexer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

impl From<&Arc<ManagedPty>> for TerminalInfo {
    fn from(pty: &Arc<ManagedPty>) -> Self {
        Self {
            pty_id: pty.pty_id.clone(),
            session_id: pty.session_id(),
            cwd: pty.cwd.clone(),
            hostname: pty.hostname.clone(),
            created_at: pty.created_at,
            last_activity_at: pty.last_activity_at(),
            multiplexer_name: pty.multiplexer_name(),
            warning: pty.warning.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TerminalsResponse {
    terminals: Vec<TerminalInfo>,
}

/// `GET /terminals`.
pub async fn list_terminals(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let terminals = state.terminals.list().iter().map(TerminalInfo::from).collect();
    Json(TerminalsResponse { terminals })
}

#[derive(Debug, Deserialize)]
pub struct CreateTerminalRequest {
    #[serde(rename = "sessionId")]
    session_id: String,
    cwd: String,
    hostname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateTerminalResponse {
    #[serde(rename = "ptyId")]
    pty_id: String,
    #[serde(rename = "sessionId")]
    session_id: String,
    hostname: String,
}

/// `POST /terminals`.
pub async fn create_terminal(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTerminalRequest>,
) -> Result<Json<CreateTerminalResponse>, (axum::http::StatusCode, Json<crate::transport::ErrorResponse>)> {
    let hostname = req.hostname.unwrap_or_else(|| state.config.effective_hostname());
    match state.terminals.get_or_create(&req.session_id, &req.cwd, &hostname, false).await {
        Ok(attached) => Ok(Json(CreateTerminalResponse {
            pty_id: attached.pty.pty_id.clone(),
            session_id: attached.pty.session_id(),
            hostname,
        })),
        Err(e) => Err(ErrorCode::Unavailable.to_http_response(e.to_string())),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateLauncherRequest {
    hostname: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateLauncherResponse {
    #[serde(rename = "ptyId")]
    pty_id: String,
    #[serde(rename = "launcherId")]
    launcher_id: String,
    hostname: String,
}

/// `POST /terminals/launcher`.
pub async fn create_launcher_terminal(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CreateLauncherRequest>>,
) -> Result<Json<CreateLauncherResponse>, (axum::http::StatusCode, Json<crate::transport::ErrorResponse>)> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let hostname = req.hostname.unwrap_or_else(|| state.config.effective_hostname());
    match state.terminals.create_launcher(&hostname).await {
        Ok((launcher_id, pty)) => Ok(Json(CreateLauncherResponse { pty_id: pty.pty_id.clone(), launcher_id, hostname })),
        Err(e) => Err(ErrorCode::Unavailable.to_http_response(e.to_string())),
    }
}

/// `DELETE /terminals/{ptyId}`.
pub async fn delete_terminal(
    State(state): State<Arc<AppState>>,
    Path(pty_id): Path<String>,
) -> Result<Json<SuccessResponse>, (axum::http::StatusCode, Json<crate::transport::ErrorResponse>)> {
    if state.terminals.get(&pty_id).is_none() {
        return Err(ErrorCode::NotFound.to_http_response("no such terminal"));
    }
    state.terminals.remove(&pty_id);
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

/// `GET /api/v1/health`.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
