// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use relay_core::{SessionRegistry, StatePublisher};
use tempfile::tempdir;
use tokio::sync::Mutex;

use super::build_api_router;
use crate::config::Config;
use crate::error::ErrorCode;
use crate::host_terminal::NullHost;
use crate::mounts::MountManager;
use crate::terminal::TerminalManager;
use crate::transport::state::AppState;

fn test_state() -> Arc<AppState> {
    let config = Arc::new(Config::parse_from(["relayd", "serve"]));
    let registry = Arc::new(Mutex::new(SessionRegistry::new("test-host", config.idle_timeout_ms, "jsonl")));
    let publisher = Arc::new(StatePublisher::new(None).expect("in-memory publisher"));
    let terminals = TerminalManager::new("claude", "xterm-256color", 80, 24);
    let mounts = MountManager::new(tempdir().expect("tempdir").path());
    Arc::new(AppState::new(registry, publisher, terminals, config, Arc::new(NullHost), Arc::new(mounts)))
}

#[test]
fn error_body_carries_code_and_message() {
    let body = ErrorCode::NotFound.to_error_body("no such terminal");
    assert_eq!(body.code, "NOT_FOUND");
    assert_eq!(body.message, "no such terminal");
}

#[test]
fn http_response_status_matches_error_code() {
    let (status, response) = ErrorCode::Unauthorized.to_http_response("nope");
    assert_eq!(status.as_u16(), 401);
    assert_eq!(response.0.error.code, "UNAUTHORIZED");
}

#[tokio::test]
async fn router_serves_health_without_auth() {
    let app = build_api_router(test_state());
    let server = axum_test::TestServer::new(app).expect("test server");
    let resp = server.get("/api/v1/health").await;
    resp.assert_status_ok();
}

#[tokio::test]
async fn router_lists_machines() {
    let app = build_api_router(test_state());
    let server = axum_test::TestServer::new(app).expect("test server");
    let resp = server.get("/machines").await;
    resp.assert_status_ok();
}
