// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decodes a single JSONL line from an agent conversation log into a
//! [`RawEntry`].
//!
//! Classification is strictly structural — shape of the JSON, not semantic
//! understanding of its content. Unknown shapes decode to
//! `ContentShape::Other` rather than failing; only JSON that doesn't parse
//! at all is an error.
//!
//! Schema assumed of a log line (one JSON object per line):
//! ```text
//! { "type": "user" | "assistant" | "system",
//!   "timestamp": <epoch-ms integer>,
//!   "sessionId": "...", "cwd": "...", "gitBranch": "...",
//!   "message": { "content": <string> | [ <content block>, ... ] } }
//! ```
//! Content blocks: `{"type": "text", "text": "..."}`,
//! `{"type": "tool_use", "name": "...", "input": {...}}`,
//! `{"type": "tool_result", ...}`. A system record is a `TURN_END` when it
//! carries a `turnDurationMs` or `stopHookActive` field.

use serde_json::Value;

use crate::model::{ContentShape, RawEntry, Role};

/// Metadata captured from the first entry in a log file that carries it.
#[derive(Debug, Default, Clone)]
pub struct SessionMetadata {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub git_branch: Option<String>,
    pub original_prompt: Option<String>,
    pub started_at: Option<i64>,
}

/// Parse one line of a log file into a `RawEntry`.
///
/// Returns `Err` only when the line is not valid JSON at all — the caller
/// (the Tailer) is responsible for skipping the line, advancing past it, and
/// emitting an error event, per §4.1's failure model. A recognized-but-odd
/// shape never errors; it decodes to `ContentShape::Other`.
pub fn parse_line(line: &str) -> Result<RawEntry, serde_json::Error> {
    let value: Value = serde_json::from_str(line)?;
    Ok(classify(&value))
}

/// Pull whatever session metadata this line happens to carry. Callers merge
/// these across entries, keeping the first non-`None` value for each field
/// (§4.2: "from the first entry that carries it").
pub fn extract_metadata(line: &str) -> Option<SessionMetadata> {
    let value: Value = serde_json::from_str(line).ok()?;
    Some(SessionMetadata {
        session_id: str_field(&value, "sessionId"),
        cwd: str_field(&value, "cwd"),
        git_branch: str_field(&value, "gitBranch"),
        original_prompt: first_user_text(&value),
        started_at: value.get("timestamp").and_then(Value::as_i64),
    })
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn first_user_text(value: &Value) -> Option<String> {
    if value.get("type").and_then(Value::as_str) != Some("user") {
        return None;
    }
    plain_text_content(value.get("message")?.get("content")?)
}

fn classify(value: &Value) -> RawEntry {
    let timestamp = value.get("timestamp").and_then(Value::as_i64);
    let record_type = value.get("type").and_then(Value::as_str);
    let content = value.get("message").and_then(|m| m.get("content"));

    match record_type {
        Some("user") => classify_user(content, timestamp),
        Some("assistant") => classify_assistant(content, timestamp),
        Some("system") => classify_system(value, timestamp),
        _ => RawEntry {
            role: Role::System,
            content_shape: ContentShape::Other,
            timestamp,
            tool: None,
            target: None,
            text: None,
        },
    }
}

fn classify_user(content: Option<&Value>, timestamp: Option<i64>) -> RawEntry {
    let content = match content {
        Some(c) => c,
        None => {
            return RawEntry {
                role: Role::User,
                content_shape: ContentShape::Other,
                timestamp,
                tool: None,
                target: None,
                text: None,
            }
        }
    };

    if let Some(text) = plain_text_content(content) {
        return RawEntry {
            role: Role::User,
            content_shape: ContentShape::Text,
            timestamp,
            tool: None,
            target: None,
            text: Some(text),
        };
    }

    if content_blocks(content).any(|b| b.get("type").and_then(Value::as_str) == Some("tool_result"))
    {
        return RawEntry {
            role: Role::User,
            content_shape: ContentShape::ToolResult,
            timestamp,
            tool: None,
            target: None,
            text: None,
        };
    }

    RawEntry {
        role: Role::User,
        content_shape: ContentShape::Other,
        timestamp,
        tool: None,
        target: None,
        text: None,
    }
}

fn classify_assistant(content: Option<&Value>, timestamp: Option<i64>) -> RawEntry {
    let content = match content {
        Some(c) => c,
        None => {
            return RawEntry {
                role: Role::Assistant,
                content_shape: ContentShape::Other,
                timestamp,
                tool: None,
                target: None,
                text: None,
            }
        }
    };

    let tool_use = content_blocks(content)
        .find(|b| b.get("type").and_then(Value::as_str) == Some("tool_use"));

    if let Some(block) = tool_use {
        let tool = block.get("name").and_then(Value::as_str).map(str::to_owned);
        let target = block.get("input").and_then(normalize_target);
        return RawEntry {
            role: Role::Assistant,
            content_shape: ContentShape::ToolUse,
            timestamp,
            tool,
            target,
            text: None,
        };
    }

    let text = plain_text_content(content).or_else(|| joined_text_blocks(content));
    RawEntry {
        role: Role::Assistant,
        content_shape: ContentShape::Text,
        timestamp,
        tool: None,
        target: None,
        text,
    }
}

fn classify_system(value: &Value, timestamp: Option<i64>) -> RawEntry {
    let is_turn_end =
        value.get("turnDurationMs").is_some() || value.get("stopHookActive").is_some();
    RawEntry {
        role: Role::System,
        content_shape: if is_turn_end { ContentShape::TurnMarker } else { ContentShape::Other },
        timestamp,
        tool: None,
        target: None,
        text: None,
    }
}

/// If `content` is a bare JSON string, return it trimmed.
fn plain_text_content(content: &Value) -> Option<String> {
    content.as_str().map(|s| s.trim().to_owned())
}

/// Iterate the content blocks of an array-shaped `content` field.
fn content_blocks(content: &Value) -> impl Iterator<Item = &Value> {
    content.as_array().into_iter().flatten()
}

/// Concatenate the text of every `{"type": "text", ...}` block, in order.
fn joined_text_blocks(content: &Value) -> Option<String> {
    let mut out = String::new();
    for block in content_blocks(content) {
        if block.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(t) = block.get("text").and_then(Value::as_str) {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(t);
            }
        }
    }
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Normalize a tool-use `input` object into a single display target: the
/// first path-like or command-like field, preferring well-known names.
fn normalize_target(input: &Value) -> Option<String> {
    const PATH_KEYS: &[&str] = &["file_path", "path", "notebook_path", "directory"];
    const COMMAND_KEYS: &[&str] = &["command", "query", "pattern", "url"];

    for key in PATH_KEYS.iter().chain(COMMAND_KEYS) {
        if let Some(s) = input.get(*key).and_then(Value::as_str) {
            return Some(s.to_owned());
        }
    }

    // Fall back to the first string-valued field, in object order.
    input.as_object()?.values().find_map(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
