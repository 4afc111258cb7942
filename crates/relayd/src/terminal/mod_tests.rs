use std::time::Duration;

use super::*;

fn manager() -> TerminalManager {
    TerminalManager::new("claude", "xterm-256color", 80, 24)
}

#[test]
fn new_manager_starts_empty() {
    let mgr = manager();
    assert!(mgr.list().is_empty());
    assert!(mgr.get("nonexistent").is_none());
}

#[test]
fn remove_unknown_pty_is_noop() {
    let mgr = manager();
    mgr.remove("nonexistent");
    assert!(mgr.list().is_empty());
}

#[test]
fn reclaim_idle_with_no_ptys_does_nothing() {
    let mgr = manager();
    mgr.reclaim_idle(0, Duration::from_secs(3600));
    assert!(mgr.list().is_empty());
}

#[test]
fn which_resolves_a_binary_on_path() {
    assert!(which("sh").is_some());
}

#[test]
fn which_rejects_an_unknown_command() {
    assert!(which("relay-definitely-not-a-real-binary").is_none());
}

#[tokio::test]
async fn get_or_create_reports_missing_agent_command_without_panicking() {
    let mgr = TerminalManager::new("relay-definitely-not-a-real-binary", "xterm-256color", 80, 24);
    let err = mgr.get_or_create("session-1", "/tmp", "host-a", false).await.unwrap_err();
    assert!(matches!(err, TerminalError::AgentCommandMissing(_)));
}

#[tokio::test]
async fn rebind_session_on_unknown_pty_is_not_found() {
    let mgr = manager();
    let err = mgr.rebind_session("nonexistent", "new-session").await.unwrap_err();
    assert!(matches!(err, TerminalError::NotFound));
}
