// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch. Kept as a plain integer (rather than
/// pulling in a calendar crate) to match the timestamp encoding already used
/// by the agent's log lines and by the rest of the workspace.
pub type EpochMs = i64;

pub fn now_ms() -> EpochMs {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as EpochMs
}

/// Role of the entity that produced a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Structural shape of a parsed log line. See `parser::parse_line` for the
/// classification rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentShape {
    Text,
    ToolUse,
    ToolResult,
    TurnMarker,
    Other,
}

/// A single parsed log line.
///
/// Immutable once created. Owned by its parent `Session`; never shared by
/// reference across session boundaries — callers that need to hand an entry
/// to another component (e.g. a change record payload) clone it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntry {
    pub role: Role,
    pub content_shape: ContentShape,
    pub timestamp: Option<EpochMs>,
    /// Tool name, present only for `ContentShape::ToolUse`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Normalized first path-like or command-like argument of a tool use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Raw text content, when the entry carries plain text (user prompts,
    /// assistant streaming text). Used to compute `goal`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A tool use still awaiting its result, surfaced on `Session.pending_tool`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTool {
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Display status of a session. See `status::derive_status` for the rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Working,
    Waiting,
    Idle,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Waiting => "waiting",
            Self::Idle => "idle",
        }
    }
}

/// Output of `status::derive_status`: the minimal tuple a caller needs to
/// decide whether a session's publicly visible state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTuple {
    pub status: SessionStatus,
    pub has_pending_tool_use: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_tool: Option<PendingTool>,
    pub message_count: u64,
    pub last_activity_at: EpochMs,
}

/// The `{type: waiting_for_input | needs_approval, timestamp}` marker that
/// rides along on the one update record whose transition was
/// `working -> waiting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    WaitingForInput,
    NeedsApproval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub timestamp: EpochMs,
}

/// A derived, displayable session.
///
/// Unique by `session_id`. Exclusively owned by the `SessionRegistry`; the
/// registry is the only writer, everything else only reads clones or
/// immutable references handed out during an event callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub hostname: String,
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_repo_id: Option<String>,
    pub original_prompt: String,
    pub started_at: EpochMs,
    pub last_activity_at: EpochMs,
    pub status: SessionStatus,
    pub message_count: u64,
    pub has_pending_tool_use: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_tool: Option<PendingTool>,
    /// Ordered, gap-free prefix of the underlying log file's entries.
    pub entries: VecDeque<RawEntry>,
    /// Byte offset of the last newline consumed from the log file.
    /// Monotonically non-decreasing.
    pub byte_position: u64,
    /// Most recent non-empty USER_PROMPT text, trimmed. Kept current as the
    /// user restates intent mid-conversation.
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr: Option<PrInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

/// Pull request / CI status surfaced by the (out-of-core) git/PR poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrInfo {
    pub number: u64,
    pub url: String,
    pub checks_status: String,
}

impl Session {
    pub fn apply_status(&mut self, tuple: StatusTuple) {
        self.status = tuple.status;
        self.has_pending_tool_use = tuple.has_pending_tool_use;
        self.pending_tool = tuple.pending_tool;
        self.message_count = tuple.message_count;
        self.last_activity_at = tuple.last_activity_at;
    }
}

/// Change-stream record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Wire record emitted by the `StatePublisher`: `{seq, op, pk, value?}`.
///
/// `value` carries the full post-image for insert/update; for delete only
/// the primary key (`pk`, the session id) is meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub seq: u64,
    pub op: ChangeOp,
    pub pk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Session>,
}
