// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn inbound_input_message_parses() {
    let msg: InboundMessage = serde_json::from_str(r#"{"type":"input","data":"ls\n"}"#).expect("parse");
    match msg {
        InboundMessage::Input { data } => assert_eq!(data, "ls\n"),
        other => panic!("expected Input, got {other:?}"),
    }
}

#[test]
fn inbound_resize_message_parses() {
    let msg: InboundMessage = serde_json::from_str(r#"{"type":"resize","cols":120,"rows":40}"#).expect("parse");
    match msg {
        InboundMessage::Resize { cols, rows } => {
            assert_eq!(cols, 120);
            assert_eq!(rows, 40);
        }
        other => panic!("expected Resize, got {other:?}"),
    }
}

#[test]
fn inbound_ping_message_parses() {
    let msg: InboundMessage = serde_json::from_str(r#"{"type":"ping"}"#).expect("parse");
    assert!(matches!(msg, InboundMessage::Ping));
}

#[test]
fn outbound_attached_serializes_with_camel_case_fields() {
    let msg = OutboundMessage::Attached {
        pty_id: "pty-1".to_owned(),
        session_id: "sess-1".to_owned(),
        multiplexer_name: "claude-abcd1234".to_owned(),
        warning: None,
    };
    let json = serde_json::to_string(&msg).expect("serialize");
    assert!(json.contains(r#""type":"attached""#));
    assert!(json.contains(r#""ptyId":"pty-1""#));
    assert!(json.contains(r#""sessionId":"sess-1""#));
    assert!(!json.contains("warning"));
}

#[test]
fn outbound_launcher_complete_serializes() {
    let msg = OutboundMessage::LauncherComplete {
        session_id: "xyz123".to_owned(),
        pty_id: "pty-2".to_owned(),
        cwd: "/work".to_owned(),
    };
    let json = serde_json::to_string(&msg).expect("serialize");
    assert!(json.contains(r#""type":"launcher_complete""#));
    assert!(json.contains(r#""cwd":"/work""#));
}

#[test]
fn outbound_exit_omits_signal_when_absent() {
    let msg = OutboundMessage::Exit { code: Some(0), signal: None };
    let json = serde_json::to_string(&msg).expect("serialize");
    assert!(!json.contains("signal"));
}
