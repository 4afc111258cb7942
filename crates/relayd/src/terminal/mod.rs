// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal Manager: one `ManagedPty` per attached multiplexer session,
//! fanning its byte stream out to every subscribed browser connection and
//! replaying a 100 KiB backlog to new subscribers (§4.6.4).
//!
//! Grounded in this workspace's PTY-spawning and ring-buffer code
//! (`pty::spawn`, `ring::RingBuffer`); the multiplexer-session lifecycle and
//! fan-out bookkeeping around them are new, built for the `tmux attach`
//! passthrough architecture rather than the capture-pane polling the
//! compatibility backend used.

pub mod launcher;
pub mod mux;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_core::Clock;

use crate::pty::{ExitStatus, NativePty};
use crate::ring::RingBuffer;

const OUTPUT_CHANNEL_CAPACITY: usize = 1024;
pub const RING_CAPACITY: usize = 100 * 1024;
/// §4.6.5: idle reclamation kills a ManagedPty after this much inactivity,
/// independent of `MAX_AGE_HOURS` (which governs publish filtering, not
/// terminal lifetime).
pub const IDLE_RECLAIM_MAX_AGE: Duration = Duration::from_secs(2 * 3600);

#[derive(Debug)]
pub enum TerminalError {
    MultiplexerMissing,
    AgentCommandMissing(String),
    Mux(mux::MuxError),
    Pty(anyhow::Error),
    NotFound,
}

impl fmt::Display for TerminalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultiplexerMissing => write!(f, "tmux is not installed; terminal features are unavailable"),
            Self::AgentCommandMissing(cmd) => write!(f, "agent command '{cmd}' not found in PATH"),
            Self::Mux(e) => write!(f, "{e}"),
            Self::Pty(e) => write!(f, "{e}"),
            Self::NotFound => write!(f, "no such terminal"),
        }
    }
}

impl std::error::Error for TerminalError {}

impl From<mux::MuxError> for TerminalError {
    fn from(e: mux::MuxError) -> Self {
        match e {
            mux::MuxError::BinaryMissing => Self::MultiplexerMissing,
            other => Self::Mux(other),
        }
    }
}

/// One PTY attached to a detached multiplexer session.
pub struct ManagedPty {
    pub pty_id: String,
    session_id: RwLock<String>,
    pub cwd: String,
    pub hostname: String,
    pub created_at: i64,
    last_activity_at: AtomicI64,
    multiplexer_name: RwLock<String>,
    pty: Arc<NativePty>,
    ring: Mutex<RingBuffer>,
    output_tx: broadcast::Sender<Bytes>,
    input_tx: mpsc::Sender<Bytes>,
    pub warning: Option<String>,
    exit_rx: watch::Receiver<Option<ExitStatus>>,
}

impl ManagedPty {
    pub fn session_id(&self) -> String {
        self.session_id.read().clone()
    }

    pub fn multiplexer_name(&self) -> String {
        self.multiplexer_name.read().clone()
    }

    pub fn last_activity_at(&self) -> i64 {
        self.last_activity_at.load(Ordering::SeqCst)
    }

    /// Current ring contents plus a receiver for everything written after
    /// this call — the replay-then-live-tail contract of §4.6.4.
    pub fn subscribe(&self) -> (Vec<u8>, broadcast::Receiver<Bytes>) {
        let ring = self.ring.lock();
        let oldest = ring.total_written().saturating_sub(RING_CAPACITY as u64);
        let (a, b) = ring.read_from(oldest).unwrap_or((&[], &[]));
        let mut snapshot = a.to_vec();
        snapshot.extend_from_slice(b);
        (snapshot, self.output_tx.subscribe())
    }

    pub async fn write_input(&self, data: Bytes) {
        let _ = self.input_tx.send(data).await;
    }

    pub fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        self.pty.resize(cols, rows)
    }

    pub fn exit_status(&self) -> Option<ExitStatus> {
        *self.exit_rx.borrow()
    }
}

/// Outcome of `get_or_create`, telling the caller whether this PTY already
/// existed in-process or was freshly attached/created.
pub struct Attached {
    pub pty: Arc<ManagedPty>,
    pub reused: bool,
}

struct Inner {
    ptys: RwLock<HashMap<String, Arc<ManagedPty>>>,
    by_session: RwLock<HashMap<String, String>>,
    launchers: RwLock<HashMap<String, launcher::Launcher>>,
}

#[derive(Clone)]
pub struct TerminalManager {
    inner: Arc<Inner>,
    agent_command: String,
    term: String,
    cols: u16,
    rows: u16,
}

impl TerminalManager {
    pub fn new(agent_command: impl Into<String>, term: impl Into<String>, cols: u16, rows: u16) -> Self {
        Self {
            inner: Arc::new(Inner {
                ptys: RwLock::new(HashMap::new()),
                by_session: RwLock::new(HashMap::new()),
                launchers: RwLock::new(HashMap::new()),
            }),
            agent_command: agent_command.into(),
            term: term.into(),
            cols,
            rows,
        }
    }

    pub fn get(&self, pty_id: &str) -> Option<Arc<ManagedPty>> {
        self.inner.ptys.read().get(pty_id).cloned()
    }

    pub fn list(&self) -> Vec<Arc<ManagedPty>> {
        self.inner.ptys.read().values().cloned().collect()
    }

    /// Look up a managed PTY by session id (or, for a launcher, by its
    /// synthetic `launcher-<id>` placeholder).
    pub fn find_by_session_id(&self, session_id: &str) -> Option<Arc<ManagedPty>> {
        let pty_id = self.inner.by_session.read().get(session_id).cloned()?;
        self.inner.ptys.read().get(&pty_id).cloned()
    }

    /// §4.6.3 step 1: create a launcher's picker session and PTY, and hold
    /// onto the `Launcher` handle (sentinel/script paths) until the WebSocket
    /// connection that owns it reads it back with [`Self::take_launcher`].
    pub async fn create_launcher(&self, hostname: &str) -> Result<(String, Arc<ManagedPty>), TerminalError> {
        let created = launcher::create_launcher(hostname).await?;
        let placeholder_id = format!("launcher-{}", created.launcher_id);
        let pty = self
            .spawn_attached(placeholder_id.clone(), "/tmp".to_owned(), hostname.to_owned(), created.multiplexer_name.clone(), None)
            .map_err(TerminalError::Pty)?;

        self.inner.by_session.write().insert(placeholder_id, pty.pty_id.clone());
        self.inner.ptys.write().insert(pty.pty_id.clone(), pty.clone());
        let launcher_id = created.launcher_id.clone();
        self.inner.launchers.write().insert(launcher_id.clone(), created);
        Ok((launcher_id, pty))
    }

    /// §4.7: the WebSocket handshake must reject an unknown `launcherId`
    /// rather than implicitly create one — a launcher is only ever created
    /// by a prior `POST /terminals/launcher`.
    pub fn take_launcher(&self, launcher_id: &str) -> Option<launcher::Launcher> {
        self.inner.launchers.write().remove(launcher_id)
    }

    /// §4.6.2: attach or create the PTY for `session_id`.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        cwd: &str,
        hostname: &str,
        force_new: bool,
    ) -> Result<Attached, TerminalError> {
        if !force_new {
            if let Some(pty_id) = self.inner.by_session.read().get(session_id).cloned() {
                if let Some(pty) = self.inner.ptys.read().get(&pty_id).cloned() {
                    return Ok(Attached { pty, reused: true });
                }
            }
        }

        if which(&self.agent_command).is_none() {
            return Err(TerminalError::AgentCommandMissing(self.agent_command.clone()));
        }

        let multiplexer_name = format!("claude-{}", mux::short_id(session_id));
        let exists = mux::has_session(&multiplexer_name).await?;
        if !exists {
            let mut command = vec![self.agent_command.clone()];
            if !force_new {
                command.push("--resume".to_owned());
                command.push(session_id.to_owned());
            }
            mux::new_detached_session(&multiplexer_name, cwd, &command).await?;
        }

        let warning = detect_outside_instance(&self.agent_command, cwd).await;

        let pty = self
            .spawn_attached(session_id.to_owned(), cwd.to_owned(), hostname.to_owned(), multiplexer_name, warning)
            .map_err(TerminalError::Pty)?;

        self.inner.by_session.write().insert(session_id.to_owned(), pty.pty_id.clone());
        self.inner.ptys.write().insert(pty.pty_id.clone(), pty.clone());
        Ok(Attached { pty, reused: false })
    }

    /// Spawn a PTY that attaches to an already-existing multiplexer session
    /// (used directly by the launcher flow, which creates its own session).
    pub(crate) fn spawn_attached(
        &self,
        session_id: String,
        cwd: String,
        hostname: String,
        multiplexer_name: String,
        warning: Option<String>,
    ) -> anyhow::Result<Arc<ManagedPty>> {
        let native = NativePty::spawn(&mux::attach_command(&multiplexer_name), self.cols, self.rows, &self.term)?;
        let pty_id = uuid::Uuid::new_v4().to_string();
        let (output_tx, _) = broadcast::channel(OUTPUT_CHANNEL_CAPACITY);
        let (input_tx, input_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (exit_tx, exit_rx) = watch::channel(None);

        let managed = Arc::new(ManagedPty {
            pty_id: pty_id.clone(),
            session_id: RwLock::new(session_id),
            cwd,
            hostname,
            created_at: relay_core::SystemClock.now_ms(),
            last_activity_at: AtomicI64::new(relay_core::SystemClock.now_ms()),
            multiplexer_name: RwLock::new(multiplexer_name),
            pty: Arc::new(native),
            ring: Mutex::new(RingBuffer::new(RING_CAPACITY)),
            output_tx,
            input_tx,
            warning,
            exit_rx,
        });

        let drive_handle = managed.clone();
        let manager = self.clone();
        tokio::spawn(async move {
            drive(drive_handle.clone(), input_rx, exit_tx).await;
            manager.remove(&drive_handle.pty_id);
        });

        Ok(managed)
    }

    /// §4.6.3 step 3: rename a multiplexer session and rebind the PTY to
    /// the session id the agent actually wrote to disk.
    pub async fn rebind_session(&self, pty_id: &str, new_session_id: &str) -> Result<(), TerminalError> {
        let Some(pty) = self.get(pty_id) else { return Err(TerminalError::NotFound) };
        let old_name = pty.multiplexer_name();
        let new_name = format!("claude-{}", mux::short_id(new_session_id));
        mux::rename_session(&old_name, &new_name).await?;

        let old_session_id = pty.session_id();
        *pty.session_id.write() = new_session_id.to_owned();
        *pty.multiplexer_name.write() = new_name;

        let mut by_session = self.inner.by_session.write();
        by_session.remove(&old_session_id);
        by_session.insert(new_session_id.to_owned(), pty_id.to_owned());
        Ok(())
    }

    /// §4.6.5: detach (not kill) any PTY idle longer than `max_age`.
    pub fn reclaim_idle(&self, now_ms: i64, max_age: Duration) {
        let threshold = max_age.as_millis() as i64;
        let stale: Vec<String> = self
            .inner
            .ptys
            .read()
            .values()
            .filter(|p| now_ms - p.last_activity_at() > threshold)
            .map(|p| p.pty_id.clone())
            .collect();
        for pty_id in stale {
            info!("reclaiming idle managed pty: {pty_id}");
            self.remove(&pty_id);
        }
    }

    pub fn remove(&self, pty_id: &str) {
        if let Some(pty) = self.inner.ptys.write().remove(pty_id) {
            self.inner.by_session.write().remove(&pty.session_id());
        }
    }

    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.inner.ptys.read().keys().cloned().collect();
        for id in ids {
            self.remove(&id);
        }
    }
}

/// One task per managed PTY: drains PTY output into the ring buffer and
/// broadcast channel, bumps `last_activity_at`, and publishes the exit
/// status once the child process (the multiplexer attach client) ends.
async fn drive(pty: Arc<ManagedPty>, input_rx: mpsc::Receiver<Bytes>, exit_tx: watch::Sender<Option<ExitStatus>>) {
    let (out_tx, mut out_rx) = mpsc::channel::<Bytes>(OUTPUT_CHANNEL_CAPACITY);
    let native = pty.pty.clone();
    let run_handle = tokio::spawn(async move { native.run(out_tx, input_rx).await });

    while let Some(chunk) = out_rx.recv().await {
        pty.ring.lock().write(&chunk);
        pty.last_activity_at.store(relay_core::SystemClock.now_ms(), Ordering::SeqCst);
        let _ = pty.output_tx.send(chunk);
    }

    match run_handle.await {
        Ok(Ok(status)) => {
            debug!("managed pty {} exited: {status:?}", pty.pty_id);
            let _ = exit_tx.send(Some(status));
        }
        Ok(Err(e)) => warn!("managed pty {} run loop failed: {e}", pty.pty_id),
        Err(e) => warn!("managed pty {} driver task panicked: {e}", pty.pty_id),
    }
}

/// Whether `command` resolves to an executable on `PATH`.
fn which(command: &str) -> Option<std::path::PathBuf> {
    if command.contains('/') {
        return std::path::Path::new(command).is_file().then(|| command.into());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).map(|dir| dir.join(command)).find(|p| p.is_file())
}

/// §4.6.2 step 4: best-effort, non-fatal detection of the agent CLI running
/// outside the multiplexer in the same working directory.
async fn detect_outside_instance(agent_command: &str, cwd: &str) -> Option<String> {
    let output = tokio::process::Command::new("pgrep").args(["-f", agent_command]).output().await.ok()?;
    let pids = String::from_utf8_lossy(&output.stdout);
    for pid in pids.split_whitespace() {
        let link = format!("/proc/{pid}/cwd");
        if let Ok(actual_cwd) = std::fs::read_link(&link) {
            if actual_cwd.to_string_lossy() == cwd {
                return Some(format!(
                    "another {agent_command} instance (pid {pid}) appears to be running outside this terminal in the same directory; close it to avoid divergent state"
                ));
            }
        }
    }
    None
}

/// Background loop calling `reclaim_idle` on an interval until `shutdown`.
pub async fn run_idle_sweeper(
    manager: TerminalManager,
    clock: Arc<dyn relay_core::Clock>,
    sweep_interval: Duration,
    max_age: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(sweep_interval);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => manager.reclaim_idle(clock.now_ms(), max_age),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
