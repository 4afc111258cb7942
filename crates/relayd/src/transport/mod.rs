// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API contract types and router assembly for the HTTP facade, the
//! `/sessions` publisher stream, and the `/terminal` WebSocket endpoint.

pub mod auth;
pub mod http;
pub mod publish;
pub mod state;
pub mod ws;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::error::ErrorCode;
use state::AppState;

/// Top-level error response envelope shared across HTTP and WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error body containing a machine-readable code and human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorCode {
    /// Convert this error code into a transport [`ErrorBody`].
    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }

    /// Convert this error code into an axum JSON error response.
    pub fn to_http_response(&self, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: self.to_error_body(message) };
        (status, Json(body))
    }
}

/// Build the axum `Router` for the Terminal Manager's HTTP+WebSocket
/// surface, bound to `--api-port` per §6.
pub fn build_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/focus-iterm", post(http::focus_iterm))
        .route("/open-session", post(http::open_session))
        .route("/focus-or-open", post(http::focus_or_open))
        .route("/machines", get(http::list_machines))
        .route("/terminals", get(http::list_terminals).post(http::create_terminal))
        .route("/terminals/launcher", post(http::create_launcher_terminal))
        .route("/terminals/{pty_id}", delete(http::delete_terminal))
        .route("/terminal", get(ws::ws_handler))
        .route("/api/v1/health", get(http::health))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Build the axum `Router` for the State Publisher's `/sessions` stream,
/// bound to `--port` per §6 — a separate server from the Terminal Manager's.
pub fn build_stream_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sessions", get(publish::stream_sessions))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
