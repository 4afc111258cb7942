// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §4.6.3: the interactive directory picker that produces a fresh agent
//! session. A launcher is a throwaway multiplexer session running a picker
//! script; once the user chooses a directory, the launcher hands off to a
//! normal `getOrCreate` call and watches the agent's log directory for the
//! new session to appear.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{mux, Attached, TerminalError, TerminalManager};

const POLL_WINDOW: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A launcher session awaiting a directory pick.
pub struct Launcher {
    pub launcher_id: String,
    pub multiplexer_name: String,
    pub sentinel_path: PathBuf,
    script_path: PathBuf,
}

/// §4.6.3 step 1: synthesize a launcher id, write its picker script and
/// sentinel, and create the detached multiplexer session running it.
pub async fn create_launcher(hostname: &str) -> Result<Launcher, TerminalError> {
    let launcher_id = Uuid::new_v4().to_string();
    let sentinel_path = sentinel_path(&launcher_id);
    let script_path = script_path(&launcher_id);
    let multiplexer_name = format!("launcher-{}", mux::short_id(&launcher_id));

    write_picker_script(&script_path, &sentinel_path).map_err(TerminalError::Pty)?;

    let command = vec!["bash".to_owned(), script_path.display().to_string()];
    mux::new_detached_session(&multiplexer_name, "/tmp", &command).await?;

    debug!("created launcher {launcher_id} on {hostname} as {multiplexer_name}");
    Ok(Launcher { launcher_id, multiplexer_name, sentinel_path, script_path })
}

fn sentinel_path(launcher_id: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/launcher_{launcher_id}"))
}

fn script_path(launcher_id: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/launcher_script_{launcher_id}.sh"))
}

/// A minimal picker: prefer `fzf` over a directory listing when present,
/// otherwise fall back to a plain prompt. Either way the chosen path is
/// written verbatim to the sentinel file.
fn write_picker_script(script_path: &Path, sentinel_path: &Path) -> anyhow::Result<()> {
    let script = format!(
        "#!/usr/bin/env bash\nset -u\nif command -v fzf >/dev/null 2>&1; then\n  picked=$(find \"$HOME\" -maxdepth 6 -type d 2>/dev/null | fzf --prompt='directory> ')\nelse\n  read -r -e -p 'directory: ' picked\nfi\nprintf '%s' \"$picked\" > {sentinel}\n",
        sentinel = sentinel_path.display(),
    );
    std::fs::write(script_path, script)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(script_path)?.permissions();
        perms.set_mode(0o700);
        std::fs::set_permissions(script_path, perms)?;
    }
    Ok(())
}

/// §4.6.3 step 2: read back the user's selection after the picker PTY
/// exits. `None` means the sentinel is absent or unreadable — the caller
/// should just propagate the PTY exit with no further reconciliation.
pub fn read_selection(launcher: &Launcher) -> Option<PathBuf> {
    let contents = std::fs::read_to_string(&launcher.sentinel_path).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return None;
    }
    let _ = std::fs::remove_file(&launcher.sentinel_path);
    let _ = std::fs::remove_file(&launcher.script_path);
    Some(PathBuf::from(trimmed))
}

/// Resolve a picker selection to a directory: the parent directory if a
/// regular file was picked.
pub fn resolve_directory(picked: &Path) -> PathBuf {
    if picked.is_file() {
        picked.parent().map(Path::to_path_buf).unwrap_or_else(|| picked.to_path_buf())
    } else {
        picked.to_path_buf()
    }
}

/// On-disk project directory the agent logs to for a given cwd: path
/// separators are replaced so the whole cwd becomes one path segment.
fn project_log_dir(cwd: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let encoded = cwd.replace('/', "-");
    home.join(".claude").join("projects").join(encoded)
}

fn log_stems(dir: &Path) -> HashSet<String> {
    let Ok(entries) = std::fs::read_dir(dir) else { return HashSet::new() };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.path().file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect()
}

/// Outcome of a completed (or timed-out) launcher reconciliation.
pub struct LauncherOutcome {
    pub session_id: String,
    pub cwd: String,
    pub pty: Attached,
}

/// §4.6.3 steps 3-5: attach the real agent session for `cwd`, then poll for
/// up to 10 seconds for a new log stem, renaming the multiplexer session
/// and rebinding the ManagedPty if one appears in time.
pub async fn complete(
    manager: &TerminalManager,
    placeholder_id: &str,
    cwd: &str,
    hostname: &str,
) -> Result<LauncherOutcome, TerminalError> {
    let log_dir = project_log_dir(cwd);
    let baseline = log_stems(&log_dir);

    let attached = manager.get_or_create(placeholder_id, cwd, hostname, true).await?;
    let pty_id = attached.pty.pty_id.clone();

    let deadline = tokio::time::Instant::now() + POLL_WINDOW;
    let mut discovered = None;
    while tokio::time::Instant::now() < deadline {
        let current = log_stems(&log_dir);
        if let Some(stem) = current.difference(&baseline).next() {
            discovered = Some(stem.clone());
            break;
        }
        sleep(POLL_INTERVAL).await;
    }

    let session_id = match discovered {
        Some(stem) => {
            if let Err(e) = manager.rebind_session(&pty_id, &stem).await {
                warn!("launcher reconciliation: failed to rebind pty {pty_id} to {stem}: {e}");
                placeholder_id.to_owned()
            } else {
                stem
            }
        }
        None => {
            debug!("launcher {placeholder_id}: no new log stem appeared within 10s, using placeholder id");
            placeholder_id.to_owned()
        }
    };

    let pty = manager.get(&pty_id).unwrap_or(attached.pty);
    Ok(LauncherOutcome { session_id, cwd: cwd.to_owned(), pty: Attached { pty, reused: attached.reused } })
}

#[cfg(test)]
#[path = "launcher_tests.rs"]
mod tests;
