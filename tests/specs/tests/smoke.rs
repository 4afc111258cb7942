// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end smoke tests that spawn the real `relayd` binary and exercise
//! its HTTP facade, `/terminal` WebSocket, and `/sessions` change stream
//! over real TCP sockets.

use std::time::Duration;

use futures_util::StreamExt;
use relay_specs::RelaydProcess;

const TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn http_health() -> anyhow::Result<()> {
    let relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/api/v1/health", relayd.api_base_url())).await?.json().await?;
    assert_eq!(resp["status"], "ok");

    Ok(())
}

#[tokio::test]
async fn http_machines_starts_empty() -> anyhow::Result<()> {
    let relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/machines", relayd.api_base_url())).await?.json().await?;
    assert_eq!(resp["machines"], serde_json::json!([]));

    Ok(())
}

#[tokio::test]
async fn http_terminals_starts_empty() -> anyhow::Result<()> {
    let relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    let resp: serde_json::Value =
        reqwest::get(format!("{}/terminals", relayd.api_base_url())).await?.json().await?;
    assert_eq!(resp["terminals"], serde_json::json!([]));

    Ok(())
}

#[tokio::test]
async fn http_delete_unknown_terminal_is_not_found() -> anyhow::Result<()> {
    let relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let resp = client.delete(format!("{}/terminals/does-not-exist", relayd.api_base_url())).send().await?;
    assert_eq!(resp.status().as_u16(), 404);

    let body: serde_json::Value = resp.json().await?;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    Ok(())
}

#[tokio::test]
async fn http_open_session_without_agent_binary_reports_failure() -> anyhow::Result<()> {
    // RelaydProcess::start() points --agent-command at a binary name that
    // can't exist, so this exercises the §4.6.7 degrade-not-crash path: the
    // daemon stays up and reports `{success: false}` rather than erroring.
    let relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let resp: serde_json::Value = client
        .post(format!("{}/open-session", relayd.api_base_url()))
        .json(&serde_json::json!({ "cwd": "/tmp", "sessionId": "smoke-test-session" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(resp["success"], false);

    Ok(())
}

#[tokio::test]
async fn sessions_stream_serves_json_lines() -> anyhow::Result<()> {
    let relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    let client = reqwest::Client::new();
    let resp = client.get(format!("{}/sessions", relayd.stream_base_url())).send().await?;
    assert!(resp.status().is_success());
    assert_eq!(resp.headers().get("content-type").and_then(|v| v.to_str().ok()), Some("application/json"));

    Ok(())
}

#[tokio::test]
async fn ws_rejects_handshake_missing_required_params() -> anyhow::Result<()> {
    let relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) = tokio_tungstenite::connect_async(relayd.ws_url("hostname=local")).await?;
    let msg = tokio::time::timeout(TIMEOUT, ws.next()).await?;

    match msg {
        Some(Ok(tokio_tungstenite::tungstenite::Message::Close(Some(frame)))) => {
            assert_eq!(u16::from(frame.code), 4000);
        }
        other => anyhow::bail!("expected a 4000 close frame, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn ws_rejects_unknown_launcher_id() -> anyhow::Result<()> {
    let relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    let (mut ws, _) =
        tokio_tungstenite::connect_async(relayd.ws_url("launcherId=never-created&hostname=local")).await?;
    let msg = tokio::time::timeout(TIMEOUT, ws.next()).await?;

    match msg {
        Some(Ok(tokio_tungstenite::tungstenite::Message::Close(Some(frame)))) => {
            assert_eq!(u16::from(frame.code), 4000);
        }
        other => anyhow::bail!("expected a 4000 close frame, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn clean_shutdown_on_sigint() -> anyhow::Result<()> {
    let mut relayd = RelaydProcess::start()?;
    relayd.wait_healthy(TIMEOUT).await?;

    std::process::Command::new("kill").args(["-INT", &relayd.pid().to_string()]).status()?;

    let status = relayd.wait_exit(TIMEOUT).await?;
    assert!(status.success(), "expected exit code 0 on clean SIGINT, got {status:?}");

    Ok(())
}
