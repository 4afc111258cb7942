// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin shell-out wrapper around the `tmux` binary: existence checks,
//! detached session creation, and renaming. No capture-pane polling here —
//! once a PTY attaches to a session, byte fan-out happens over the PTY
//! itself (see `terminal::ManagedPty`).
//!
//! Grounded in the has-session/session-naming conventions this workspace
//! already used for tmux compatibility, minus the polling read loop.

use std::fmt;
use std::process::Stdio;

use tokio::process::Command;

/// Error raised when the `tmux` binary itself can't be found or run, as
/// opposed to a session-level failure.
#[derive(Debug)]
pub enum MuxError {
    BinaryMissing,
    CommandFailed(String),
}

impl fmt::Display for MuxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BinaryMissing => write!(f, "tmux is not installed or not in PATH"),
            Self::CommandFailed(detail) => write!(f, "tmux command failed: {detail}"),
        }
    }
}

impl std::error::Error for MuxError {}

fn cmd() -> Command {
    Command::new("tmux")
}

async fn run(args: &[&str]) -> Result<bool, MuxError> {
    let status = cmd()
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MuxError::BinaryMissing
            } else {
                MuxError::CommandFailed(e.to_string())
            }
        })?;
    Ok(status.success())
}

/// `tmux has-session -t <name>`.
pub async fn has_session(name: &str) -> Result<bool, MuxError> {
    run(&["has-session", "-t", name]).await
}

/// `tmux new-session -d -s <name> -c <cwd> <command...>`.
pub async fn new_detached_session(name: &str, cwd: &str, command: &[String]) -> Result<(), MuxError> {
    let mut args: Vec<&str> = vec!["new-session", "-d", "-s", name, "-c", cwd];
    args.extend(command.iter().map(String::as_str));
    let ok = run(&args).await?;
    if !ok {
        return Err(MuxError::CommandFailed(format!("failed to create session '{name}'")));
    }
    Ok(())
}

/// `tmux rename-session -t <old> <new>`.
pub async fn rename_session(old: &str, new: &str) -> Result<(), MuxError> {
    let ok = run(&["rename-session", "-t", old, new]).await?;
    if !ok {
        return Err(MuxError::CommandFailed(format!("failed to rename session '{old}' to '{new}'")));
    }
    Ok(())
}

/// `tmux kill-session -t <name>`, tolerating a session that's already gone.
pub async fn kill_session(name: &str) {
    let _ = run(&["kill-session", "-t", name]).await;
}

/// The attach command to hand to `NativePty::spawn`.
pub fn attach_command(name: &str) -> Vec<String> {
    vec!["tmux".to_owned(), "attach-session".to_owned(), "-t".to_owned(), name.to_owned()]
}

/// First 8 characters of an id, used to build multiplexer session names.
pub fn short_id(id: &str) -> &str {
    let end = id.char_indices().nth(8).map(|(i, _)| i).unwrap_or(id.len());
    &id[..end]
}

#[cfg(test)]
#[path = "mux_tests.rs"]
mod tests;
