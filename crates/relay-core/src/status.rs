// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure function from an entry list and a clock reading to a [`StatusTuple`].
//!
//! No `self`, no hidden state: `derive_status` depends only on its
//! arguments, so it can be called from the Tailer's per-batch path and from
//! the Periodic Re-evaluator's timer path with identical semantics.

use crate::model::{ContentShape, EpochMs, PendingTool, RawEntry, Role, SessionStatus, StatusTuple};

/// Fast-idle threshold after assistant streaming text with no turn marker.
pub const FAST_IDLE_MS: i64 = 500;
/// Threshold before an unanswered tool use counts as needing approval.
pub const PENDING_TOOL_MS: i64 = 5_000;
/// Default idle timeout, overridable via configuration.
pub const DEFAULT_IDLE_TIMEOUT_MS: i64 = 20 * 60 * 1000;

/// Derive the display status tuple for a session's entries as of `now`.
pub fn derive_status(entries: &[RawEntry], now: EpochMs, idle_timeout_ms: i64) -> StatusTuple {
    let last_activity_at = entries
        .iter()
        .rev()
        .find_map(|e| e.timestamp)
        .unwrap_or(now);

    let pending_tool = find_pending_tool(entries);
    let has_pending_tool_use = pending_tool.is_some();
    let delta = now - last_activity_at;
    let message_count =
        entries.iter().filter(|e| matches!(e.role, Role::User | Role::Assistant)).count() as u64;

    let last = entries.last();

    let status = if has_pending_tool_use && delta >= PENDING_TOOL_MS {
        SessionStatus::Waiting
    } else if matches!(last, Some(e) if e.content_shape == ContentShape::TurnMarker) {
        SessionStatus::Waiting
    } else if matches!(last, Some(e) if e.role == Role::Assistant && e.content_shape == ContentShape::Text)
        && delta >= FAST_IDLE_MS
    {
        SessionStatus::Waiting
    } else if is_active_tail(last, delta) {
        SessionStatus::Working
    } else if delta >= idle_timeout_ms {
        SessionStatus::Idle
    } else {
        SessionStatus::Working
    };

    StatusTuple { status, has_pending_tool_use, pending_tool, message_count, last_activity_at }
}

/// True when the most recent entry is recent enough to count as active work
/// in its own right (before the idle-timeout fallback applies).
fn is_active_tail(last: Option<&RawEntry>, delta: i64) -> bool {
    match last {
        None => false,
        Some(e) => match e.content_shape {
            ContentShape::Text if e.role == Role::Assistant => delta < FAST_IDLE_MS,
            ContentShape::Text | ContentShape::ToolResult | ContentShape::ToolUse => delta < PENDING_TOOL_MS,
            ContentShape::TurnMarker | ContentShape::Other => false,
        },
    }
}

/// The most recent `ASSISTANT_TOOL_USE` entry that has not yet been answered
/// by a `TOOL_RESULT` or closed out by a `TURN_END`, if any.
fn find_pending_tool(entries: &[RawEntry]) -> Option<PendingTool> {
    for entry in entries.iter().rev() {
        match entry.content_shape {
            ContentShape::ToolResult | ContentShape::TurnMarker => return None,
            ContentShape::ToolUse if entry.role == Role::Assistant => {
                return entry.tool.clone().map(|tool| PendingTool { tool, target: entry.target.clone() });
            }
            _ => continue,
        }
    }
    None
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
