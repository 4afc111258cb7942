// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::{Command, Config};

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

#[test]
fn defaults_are_correct() {
    let config = parse(&["relayd", "serve"]);
    assert_eq!(config.port, 4450);
    assert_eq!(config.api_port, 4451);
    assert_eq!(config.max_age_hours, 24);
    assert!(!config.notifications_enabled);
    assert_eq!(config.idle_timeout_ms, 1_200_000);
    assert_eq!(config.log_format, "json");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.agent_command, "claude");
    assert!(matches!(config.command, Command::Serve { clear: false }));
}

#[test]
fn serve_clear_flag_parses() {
    let config = parse(&["relayd", "serve", "--clear"]);
    assert!(matches!(config.command, Command::Serve { clear: true }));
}

#[test]
fn valid_config_passes_validation() -> anyhow::Result<()> {
    let config = parse(&["relayd", "serve"]);
    config.validate()
}

#[test]
fn same_port_and_api_port_is_rejected() {
    let config = parse(&["relayd", "--api-port", "4450", "serve"]);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("must differ"));
}

#[test]
fn zero_max_age_hours_is_rejected() {
    let config = parse(&["relayd", "--max-age-hours", "0", "serve"]);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("greater than zero"));
}

#[test]
fn invalid_log_format_is_rejected() {
    let config = parse(&["relayd", "--log-format", "xml", "serve"]);
    assert!(config.validate().is_err());
}

#[test]
fn hostname_override_takes_precedence() {
    let config = parse(&["relayd", "--hostname", "override-host", "serve"]);
    assert_eq!(config.effective_hostname(), "override-host");
}

#[test]
fn state_dir_override_takes_precedence() {
    let config = parse(&["relayd", "--state-dir", "/tmp/relay-state", "serve"]);
    assert_eq!(config.effective_state_dir(), std::path::PathBuf::from("/tmp/relay-state"));
}
