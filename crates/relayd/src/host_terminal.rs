// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §4.9: host terminal focus/open, isolated behind one small trait so the
//! only platform-specific shell-out (`osascript` driving iTerm2) lives in a
//! single `cfg(target_os = "macos")` implementation.

use std::time::Duration;

use async_trait::async_trait;

/// External-call timeout shared by every thin collaborator (§5).
pub const EXTERNAL_CALL_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait HostTerminal: Send + Sync {
    /// Bring the host terminal application to the foreground, optionally
    /// matching a window/tab by `search_term`.
    async fn focus(&self, search_term: Option<&str>) -> bool;

    /// Open a new tab/window running `command` in `cwd`.
    async fn open(&self, cwd: &str, command: &str) -> bool;
}

/// Does nothing; used whenever `TERMINAL=none` or the platform has no
/// supported integration.
pub struct NullHost;

#[async_trait]
impl HostTerminal for NullHost {
    async fn focus(&self, _search_term: Option<&str>) -> bool {
        false
    }

    async fn open(&self, _cwd: &str, _command: &str) -> bool {
        false
    }
}

/// Resolve the configured host terminal backend from the `TERMINAL` env var
/// value: `"iterm2"` on macOS, anything else (including unset) falls back
/// to [`NullHost`].
pub fn resolve(terminal: Option<&str>) -> std::sync::Arc<dyn HostTerminal> {
    match terminal {
        Some("iterm2") => iterm::host(),
        _ => std::sync::Arc::new(NullHost),
    }
}

#[cfg(target_os = "macos")]
mod iterm {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::process::Command;

    use super::{HostTerminal, EXTERNAL_CALL_TIMEOUT};

    pub struct ItermHost;

    #[async_trait]
    impl HostTerminal for ItermHost {
        async fn focus(&self, search_term: Option<&str>) -> bool {
            let script = match search_term {
                Some(term) => format!(
                    "tell application \"iTerm2\"\nactivate\nrepeat with w in windows\nrepeat with t in tabs of w\nif (name of t contains \"{term}\") then select t\nend repeat\nend repeat\nend tell"
                ),
                None => "tell application \"iTerm2\" to activate".to_owned(),
            };
            run_osascript(&script).await
        }

        async fn open(&self, cwd: &str, command: &str) -> bool {
            let script = format!(
                "tell application \"iTerm2\"\nactivate\ntell current window\ncreate tab with default profile\ntell current session to write text \"cd {cwd} && {command}\"\nend tell\nend tell"
            );
            run_osascript(&script).await
        }
    }

    async fn run_osascript(script: &str) -> bool {
        let result = tokio::time::timeout(
            EXTERNAL_CALL_TIMEOUT,
            Command::new("osascript").arg("-e").arg(script).status(),
        )
        .await;
        matches!(result, Ok(Ok(status)) if status.success())
    }

    pub fn host() -> Arc<dyn HostTerminal> {
        Arc::new(ItermHost)
    }
}

#[cfg(not(target_os = "macos"))]
mod iterm {
    use std::sync::Arc;

    use super::{HostTerminal, NullHost};

    pub fn host() -> Arc<dyn HostTerminal> {
        Arc::new(NullHost)
    }
}

#[cfg(test)]
#[path = "host_terminal_tests.rs"]
mod tests;
