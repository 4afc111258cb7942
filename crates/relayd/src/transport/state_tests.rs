// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use relay_core::{SessionRegistry, StatePublisher};
use tempfile::tempdir;
use tokio::sync::Mutex;

use super::*;
use crate::config::Config;
use crate::host_terminal::NullHost;
use crate::mounts::MountManager;
use crate::terminal::TerminalManager;

fn test_state(auth_token: Option<&str>) -> AppState {
    let mut args = vec!["relayd".to_owned()];
    if let Some(token) = auth_token {
        args.push("--auth-token".to_owned());
        args.push(token.to_owned());
    }
    args.push("serve".to_owned());
    let config = Arc::new(Config::parse_from(args));

    let registry = Arc::new(Mutex::new(SessionRegistry::new("test-host", config.idle_timeout_ms, "jsonl")));
    let publisher = Arc::new(StatePublisher::new(None).expect("in-memory publisher"));
    let terminals = TerminalManager::new("claude", "xterm-256color", 80, 24);
    let mounts = MountManager::new(tempdir().expect("tempdir").path());

    AppState::new(registry, publisher, terminals, config, Arc::new(NullHost), Arc::new(mounts))
}

#[test]
fn auth_token_mirrors_config() {
    let state = test_state(Some("s3cr3t"));
    assert_eq!(state.auth_token.as_deref(), Some("s3cr3t"));
}

#[test]
fn auth_token_is_none_when_unconfigured() {
    let state = test_state(None);
    assert!(state.auth_token.is_none());
}

#[test]
fn debug_output_never_leaks_the_token() {
    let state = test_state(Some("s3cr3t"));
    let rendered = format!("{state:?}");
    assert!(!rendered.contains("s3cr3t"));
}
