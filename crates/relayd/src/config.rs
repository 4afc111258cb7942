// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Session-awareness daemon: tails agent conversation logs, derives live
/// session status, and brokers terminal access to each session's multiplexed
/// shell.
#[derive(Debug, Parser)]
#[command(name = "relayd", version, about)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,

    /// Port for the `/sessions` state-publisher stream.
    #[arg(long, env = "PORT", default_value = "4450")]
    pub port: u16,

    /// Port for the Terminal Manager's HTTP/WebSocket surface.
    #[arg(long, env = "API_PORT", default_value = "4451")]
    pub api_port: u16,

    /// Sessions older than this are filtered out of publish, in hours.
    #[arg(long, env = "MAX_AGE_HOURS", default_value = "24")]
    pub max_age_hours: u64,

    /// API key for the Summary Generator. Summaries are skipped when unset.
    #[arg(long, env = "ANTHROPIC_API_KEY")]
    pub anthropic_api_key: Option<String>,

    /// Enable desktop notifications on working -> waiting transitions.
    #[arg(long, env = "NOTIFICATIONS_ENABLED", default_value = "false")]
    pub notifications_enabled: bool,

    /// Host terminal integration to drive for focus/open actions
    /// (e.g. "iterm2"). Unset or unrecognized disables the capability.
    #[arg(long, env = "TERMINAL")]
    pub terminal: Option<String>,

    /// Override the hostname recorded on sessions derived on this machine.
    #[arg(long, env = "HOSTNAME")]
    pub hostname: Option<String>,

    /// Bearer token required on every HTTP/WS request except health checks.
    #[arg(long, env = "RELAY_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Root directory for persisted state (change log, machines.json).
    /// Defaults to `~/.claude-code-ui`.
    #[arg(long, env = "RELAY_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Session idle timeout in milliseconds, overriding the 20-minute default.
    #[arg(long, env = "RELAY_IDLE_TIMEOUT_MS", default_value = "1200000")]
    pub idle_timeout_ms: i64,

    /// Log format (json or text).
    #[arg(long, env = "RELAY_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "RELAY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Binary name or path for the agent CLI launched inside each managed
    /// terminal (e.g. "claude").
    #[arg(long, env = "RELAY_AGENT_COMMAND", default_value = "claude")]
    pub agent_command: String,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground.
    Serve {
        /// Wipe the persisted change log and registry before starting.
        #[arg(long)]
        clear: bool,
    },
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == self.api_port {
            anyhow::bail!("--port and --api-port must differ");
        }
        if self.max_age_hours == 0 {
            anyhow::bail!("--max-age-hours must be greater than zero");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    /// Resolve the hostname recorded on derived sessions: the `--hostname`
    /// override if given, otherwise the machine's actual hostname.
    pub fn effective_hostname(&self) -> String {
        if let Some(h) = &self.hostname {
            return h.clone();
        }
        nix::unistd::gethostname()
            .ok()
            .and_then(|s| s.into_string().ok())
            .unwrap_or_else(|| "unknown-host".to_owned())
    }

    /// Root directory for persisted state.
    pub fn effective_state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(default_state_dir)
    }
}

fn default_state_dir() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    home.join(".claude-code-ui")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
