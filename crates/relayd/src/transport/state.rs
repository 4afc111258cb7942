// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared application state passed to every HTTP and WebSocket handler via
//! axum's `State` extractor.

use std::sync::Arc;

use relay_core::{SessionRegistry, StatePublisher};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::host_terminal::HostTerminal;
use crate::mounts::MountManager;
use crate::terminal::TerminalManager;

/// All state shared across handlers, organized by concern:
/// - `registry` + `publisher`: the session-derivation pipeline (relay-core)
/// - `terminals`: multiplexer-backed PTYs and their fan-out
/// - collaborators: host terminal focus and remote mounts
pub struct AppState {
    pub registry: Arc<Mutex<SessionRegistry>>,
    pub publisher: Arc<StatePublisher>,
    pub terminals: TerminalManager,
    pub auth_token: Option<String>,
    pub config: Arc<Config>,
    pub host_terminal: Arc<dyn HostTerminal>,
    pub mounts: Arc<MountManager>,
}

impl AppState {
    pub fn new(
        registry: Arc<Mutex<SessionRegistry>>,
        publisher: Arc<StatePublisher>,
        terminals: TerminalManager,
        config: Arc<Config>,
        host_terminal: Arc<dyn HostTerminal>,
        mounts: Arc<MountManager>,
    ) -> Self {
        let auth_token = config.auth_token.clone();
        Self { registry, publisher, terminals, auth_token, config, host_terminal, mounts }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").field("auth_token", &self.auth_token.is_some()).finish()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
