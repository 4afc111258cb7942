// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root — shared by `main` and integration tests. Wires the
//! Session Derivation Core (`relay-core`) to the Terminal Multiplexer Bridge
//! and the thin collaborators, then serves the two external surfaces on
//! their configured ports until a shutdown signal arrives.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use relay_core::{publish_event, LogTailer, PeriodicReevaluator, SessionRegistry, StatePublisher, SystemClock};

use crate::config::{Command, Config};
use crate::git_poll;
use crate::host_terminal;
use crate::mounts::{MountManager, MountStatus};
use crate::notifications::{self, NotificationSink};
use crate::summary::SummaryClient;
use crate::terminal::{run_idle_sweeper, TerminalManager};
use crate::transport::state::AppState;
use crate::transport::{build_api_router, build_stream_router};

/// Re-evaluator and collaborator-sweep cadence (§4.8's default, shared by
/// the Git/PR poller and Summary Generator since neither has its own).
const SWEEP_INTERVAL: Duration = Duration::from_millis(relay_core::reevaluator::DEFAULT_INTERVAL_MS * 5);
const IDLE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub struct RunResult {
    pub exit_code: i32,
}

/// Initialize tracing from config. Uses `try_init` so it's safe to call more
/// than once (e.g. across `prepare`/test invocations in the same process).
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

/// Where the local host's agent conversation logs live. Mounted machines add
/// their own root under the Mount Manager's mount point (§4.10).
fn default_log_root() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    home.join(".claude").join("projects")
}

/// Run the daemon to completion (until a shutdown signal). This is the full
/// production codepath: build the Session Derivation Core, the Terminal
/// Manager, every thin collaborator, bind both external surfaces, and drive
/// the background tasks until `shutdown` fires.
pub async fn run(config: Config) -> anyhow::Result<RunResult> {
    init_tracing(&config);

    let Command::Serve { clear } = &config.command;
    let clear = *clear;
    let hostname = config.effective_hostname();
    let state_dir = config.effective_state_dir();
    let stream_dir = state_dir.join("streams").join("sessions");

    if clear {
        info!(path = %stream_dir.display(), "--clear: removing persisted state publisher stream");
        if let Err(e) = std::fs::remove_dir_all(&stream_dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                anyhow::bail!("failed to clear state directory {}: {e}", stream_dir.display());
            }
        }
    }

    let shutdown = CancellationToken::new();

    let max_age_ms = (config.max_age_hours as i64).saturating_mul(3_600_000);
    let registry = Arc::new(Mutex::new(
        SessionRegistry::new(hostname.clone(), config.idle_timeout_ms, ".jsonl").with_max_age_ms(max_age_ms),
    ));
    let publisher = Arc::new(
        StatePublisher::new(Some(stream_dir.join("log.jsonl")))
            .map_err(|e| anyhow::anyhow!("state publisher directory unwritable: {e}"))?,
    );
    let terminals = TerminalManager::new(config.agent_command.clone(), "xterm-256color", 80, 24);
    let mounts = Arc::new(MountManager::new(&state_dir));
    let host_terminal = host_terminal::resolve(config.terminal.as_deref());
    let notification_sink: Arc<dyn NotificationSink> = Arc::from(notifications::resolve(config.notifications_enabled));
    let summary_client = config.anthropic_api_key.as_deref().map(SummaryClient::new).transpose()?.map(Arc::new);

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(
        Arc::clone(&registry),
        Arc::clone(&publisher),
        terminals.clone(),
        Arc::clone(&config),
        host_terminal,
        Arc::clone(&mounts),
    ));

    spawn_log_tailer(&state_dir, &mounts, Arc::clone(&registry), Arc::clone(&publisher), Arc::clone(&notification_sink), shutdown.clone());
    spawn_periodic_reevaluator(Arc::clone(&registry), Arc::clone(&publisher), shutdown.clone());
    spawn_idle_sweeper(terminals.clone(), shutdown.clone());
    spawn_collaborator_sweep(Arc::clone(&registry), Arc::clone(&publisher), summary_client, shutdown.clone());

    bind_stream_server(Arc::clone(&state), config.port, shutdown.clone()).await?;
    bind_api_server(Arc::clone(&state), config.api_port, shutdown.clone()).await?;

    wait_for_shutdown_signal(shutdown.clone()).await;

    terminals.shutdown().await;
    if let Err(e) = mounts.save() {
        warn!("failed to persist machine config on shutdown: {e}");
    }

    Ok(RunResult { exit_code: 0 })
}

/// Bind and spawn the State Publisher's `/sessions` stream server (`--port`).
async fn bind_stream_server(state: Arc<AppState>, port: u16, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind stream server on port {port}: {e}"))?;
    info!("stream server listening on {}", listener.local_addr()?);
    let router = build_stream_router(state);
    tokio::spawn(async move {
        let result = axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await;
        if let Err(e) = result {
            error!("stream server error: {e}");
        }
    });
    Ok(())
}

/// Bind and spawn the Terminal Manager's HTTP+WebSocket server (`--api-port`).
async fn bind_api_server(state: Arc<AppState>, port: u16, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind api server on port {port}: {e}"))?;
    info!("api server listening on {}", listener.local_addr()?);
    let router = build_api_router(state);
    tokio::spawn(async move {
        let result = axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await;
        if let Err(e) = result {
            error!("api server error: {e}");
        }
    });
    Ok(())
}

/// §4.1: tail the local project root plus every mounted machine's mount
/// point, feed batches into the Session Registry, publish the resulting
/// events, and fire desktop notifications for freshly-waiting sessions.
fn spawn_log_tailer(
    state_dir: &Path,
    mounts: &Arc<MountManager>,
    registry: Arc<Mutex<SessionRegistry>>,
    publisher: Arc<StatePublisher>,
    notification_sink: Arc<dyn NotificationSink>,
    shutdown: CancellationToken,
) {
    let mut roots = vec![default_log_root()];
    for machine in mounts.machines() {
        if machine.status == MountStatus::Mounted {
            roots.push(state_dir.join("mounts").join(&machine.machine.name));
        }
    }
    let tailer = LogTailer::new(roots, ".jsonl", "");

    let (tail_tx, mut tail_rx) = mpsc::channel(256);
    let tailer_shutdown = shutdown.clone();
    tokio::spawn(async move { tailer.run(tail_tx, tailer_shutdown).await });

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                event = tail_rx.recv() => {
                    let Some(event) = event else { return };
                    let now = relay_core::model::now_ms();
                    let events = registry.lock().await.handle_tail_event(event, now);
                    for event in events {
                        if let relay_core::RegistryEvent::Updated(ref session) = event {
                            if let Some(notification) = &session.notification {
                                notification_sink.notify(&session.session_id, notification);
                            }
                        }
                        publish_event(&publisher, event);
                    }
                }
            }
        }
    });
}

/// §4.8: drive the Status Deriver for sessions with no recent file event.
fn spawn_periodic_reevaluator(registry: Arc<Mutex<SessionRegistry>>, publisher: Arc<StatePublisher>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        PeriodicReevaluator::new(SystemClock).run(registry, publisher, shutdown).await;
    });
}

/// §4.6.5: detach managed PTYs idle longer than the fixed 2h reclamation
/// window (independent of `--max-age-hours`, which governs publish
/// filtering, not terminal lifetime).
fn spawn_idle_sweeper(terminals: TerminalManager, shutdown: CancellationToken) {
    tokio::spawn(run_idle_sweeper(
        terminals,
        Arc::new(SystemClock),
        IDLE_SWEEP_INTERVAL,
        crate::terminal::IDLE_RECLAIM_MAX_AGE,
        shutdown,
    ));
}

/// §4.11/§4.12: on the same cadence as the Periodic Re-evaluator, poll PR/CI
/// status for every session (when `gh` is on `PATH`) and generate a one-line
/// summary for sessions that don't have one yet (when an API key is
/// configured). Both collaborators degrade to "leave the field as-is" on
/// failure per §7, never erroring the sweep.
fn spawn_collaborator_sweep(
    registry: Arc<Mutex<SessionRegistry>>,
    publisher: Arc<StatePublisher>,
    summary_client: Option<Arc<SummaryClient>>,
    shutdown: CancellationToken,
) {
    let gh_available = git_poll::gh_available();
    if !gh_available && summary_client.is_none() {
        return;
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = ticker.tick() => {
                    let snapshot: Vec<_> = registry.lock().await.all().cloned().collect();
                    for session in snapshot {
                        if gh_available && session.git_branch.is_some() {
                            if let Some(pr) = git_poll::poll(&session.cwd).await {
                                let mut guard = registry.lock().await;
                                if let Some(event) = guard.set_pr(&session.session_id, Some(pr)) {
                                    drop(guard);
                                    publish_event(&publisher, event);
                                }
                            }
                        }

                        if let Some(client) = &summary_client {
                            if session.summary.is_none() && session.status != relay_core::SessionStatus::Working {
                                let excerpt = transcript_excerpt(&session);
                                if !excerpt.is_empty() {
                                    if let Some(summary) = client.summarize(&excerpt).await {
                                        let mut guard = registry.lock().await;
                                        if let Some(event) = guard.set_summary(&session.session_id, Some(summary)) {
                                            drop(guard);
                                            publish_event(&publisher, event);
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    });
}

/// The last few lines of user/assistant text, joined, for the Summary
/// Generator's prompt (§4.11).
fn transcript_excerpt(session: &relay_core::Session) -> String {
    session
        .entries
        .iter()
        .rev()
        .filter_map(|entry| entry.text.as_deref())
        .take(20)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

/// First signal (SIGTERM/SIGINT): cancel `shutdown` for a graceful drain.
/// Second signal: force an immediate exit.
async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

    tokio::select! {
        _ = async { if let Some(s) = sigterm.as_mut() { s.recv().await } else { std::future::pending().await } } => {
            info!("received SIGTERM");
        }
        _ = async { if let Some(s) = sigint.as_mut() { s.recv().await } else { std::future::pending().await } } => {
            info!("received SIGINT");
        }
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();

    tokio::select! {
        _ = async { if let Some(s) = sigterm.as_mut() { s.recv().await } else { std::future::pending().await } } => {
            warn!("received second signal, forcing exit");
            std::process::exit(130);
        }
        _ = async { if let Some(s) = sigint.as_mut() { s.recv().await } else { std::future::pending().await } } => {
            warn!("received second signal, forcing exit");
            std::process::exit(130);
        }
        _ = tokio::time::sleep(Duration::from_millis(200)) => {}
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
