use super::*;
use crate::model::{ContentShape, Role};

#[test]
fn user_prompt_is_plain_string_content() {
    let line = r#"{"type":"user","timestamp":1000,"message":{"content":"build X"}}"#;
    let entry = parse_line(line).unwrap();
    assert_eq!(entry.role, Role::User);
    assert_eq!(entry.content_shape, ContentShape::Text);
    assert_eq!(entry.text.as_deref(), Some("build X"));
}

#[test]
fn user_tool_result_is_array_with_tool_result_block() {
    let line = r#"{"type":"user","timestamp":1000,
        "message":{"content":[{"type":"tool_result","content":"ok"}]}}"#;
    let entry = parse_line(line).unwrap();
    assert_eq!(entry.role, Role::User);
    assert_eq!(entry.content_shape, ContentShape::ToolResult);
}

#[test]
fn assistant_streaming_has_no_tool_use() {
    let line = r#"{"type":"assistant","timestamp":1000,
        "message":{"content":[{"type":"text","text":"thinking..."}]}}"#;
    let entry = parse_line(line).unwrap();
    assert_eq!(entry.content_shape, ContentShape::Text);
    assert_eq!(entry.text.as_deref(), Some("thinking..."));
}

#[test]
fn assistant_tool_use_extracts_name_and_target() {
    let line = r#"{"type":"assistant","timestamp":1000,
        "message":{"content":[{"type":"tool_use","name":"Bash","input":{"command":"ls"}}]}}"#;
    let entry = parse_line(line).unwrap();
    assert_eq!(entry.content_shape, ContentShape::ToolUse);
    assert_eq!(entry.tool.as_deref(), Some("Bash"));
    assert_eq!(entry.target.as_deref(), Some("ls"));
}

#[test]
fn assistant_tool_use_prefers_path_over_command() {
    let line = r#"{"type":"assistant","timestamp":1000,
        "message":{"content":[{"type":"tool_use","name":"Edit",
        "input":{"file_path":"/a/b.rs","command":"ignored"}}]}}"#;
    let entry = parse_line(line).unwrap();
    assert_eq!(entry.target.as_deref(), Some("/a/b.rs"));
}

#[test]
fn system_turn_end_on_duration_field() {
    let line = r#"{"type":"system","timestamp":1000,"turnDurationMs":842}"#;
    let entry = parse_line(line).unwrap();
    assert_eq!(entry.role, Role::System);
    assert_eq!(entry.content_shape, ContentShape::TurnMarker);
}

#[test]
fn system_without_turn_markers_is_other() {
    let line = r#"{"type":"system","timestamp":1000}"#;
    let entry = parse_line(line).unwrap();
    assert_eq!(entry.content_shape, ContentShape::Other);
}

#[test]
fn invalid_json_is_an_error() {
    assert!(parse_line("not json").is_err());
}

#[test]
fn metadata_captures_session_id_cwd_and_prompt() {
    let line = r#"{"type":"user","timestamp":1000,"sessionId":"abc123","cwd":"/work",
        "gitBranch":"main","message":{"content":"  build X  "}}"#;
    let meta = extract_metadata(line).unwrap();
    assert_eq!(meta.session_id.as_deref(), Some("abc123"));
    assert_eq!(meta.cwd.as_deref(), Some("/work"));
    assert_eq!(meta.git_branch.as_deref(), Some("main"));
    assert_eq!(meta.original_prompt.as_deref(), Some("build X"));
}
