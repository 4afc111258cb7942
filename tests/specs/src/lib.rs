// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end binary smoke tests.
//!
//! Spawns the real `relayd` binary as a subprocess and exercises its HTTP
//! facade, `/terminal` WebSocket, and `/sessions` change stream over real
//! TCP sockets.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Once;
use std::time::Duration;

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls. Safe to call more
/// than once — only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Resolve the path to the compiled `relayd` binary.
pub fn relayd_binary() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    // tests/specs -> tests -> workspace root
    let workspace = manifest.parent().and_then(|p| p.parent()).unwrap_or(manifest);
    workspace.join("target").join("debug").join("relayd")
}

/// Find a free TCP port by binding to :0 then releasing.
pub fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A running `relayd serve` process, killed on drop.
pub struct RelaydProcess {
    child: Child,
    port: u16,
    api_port: u16,
    _state_dir: tempfile::TempDir,
}

impl RelaydProcess {
    /// Spawn `relayd serve` bound to two freshly allocated ports, with an
    /// isolated temp state directory so runs never collide with a real
    /// `~/.claude-code-ui`.
    pub fn start() -> anyhow::Result<Self> {
        ensure_crypto();
        let binary = relayd_binary();
        anyhow::ensure!(binary.exists(), "relayd binary not found at {}; run `cargo build` first", binary.display());

        let port = free_port()?;
        let api_port = free_port()?;
        let state_dir = tempfile::tempdir()?;

        let child = Command::new(&binary)
            .args([
                "--port",
                &port.to_string(),
                "--api-port",
                &api_port.to_string(),
                "--state-dir",
                &state_dir.path().to_string_lossy(),
                "--hostname",
                "test-host",
                "--log-format",
                "text",
                "--log-level",
                "warn",
                "--agent-command",
                "relayd-smoke-test-nonexistent-binary",
                "serve",
            ])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        Ok(Self { child, port, api_port, _state_dir: state_dir })
    }

    /// The HTTP+WebSocket surface (`--api-port`).
    pub fn api_base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.api_port)
    }

    /// The `/sessions` change-stream surface (`--port`).
    pub fn stream_base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// WebSocket URL for `/terminal`, with the caller's query string
    /// (e.g. `"sessionId=a&cwd=/w&hostname=local"`).
    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://127.0.0.1:{}/terminal?{}", self.api_port, query)
    }

    /// Poll `GET /api/v1/health` on the API port until it responds, or
    /// time out.
    pub async fn wait_healthy(&self, timeout: Duration) -> anyhow::Result<()> {
        let client = reqwest::Client::new();
        let url = format!("{}/api/v1/health", self.api_base_url());
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("relayd did not become healthy within {timeout:?}");
            }
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// OS process id, for sending it a signal directly (e.g. SIGINT to
    /// exercise the daemon's graceful-shutdown path).
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    /// Wait for the process to exit within `timeout`.
    pub async fn wait_exit(&mut self, timeout: Duration) -> anyhow::Result<std::process::ExitStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() > deadline {
                anyhow::bail!("relayd did not exit within {timeout:?}");
            }
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for RelaydProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
