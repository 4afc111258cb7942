// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory mapping from session id to derived `Session`, with the
//! supersession rule and `created`/`updated`/`deleted` event emission.
//!
//! Single-writer discipline: every public method takes `&mut self` and the
//! caller (the daemon's ingestion task) is expected to hold the only handle
//! to one `SessionRegistry`, funnelling all tailer batches and re-evaluator
//! ticks through it serially. This mirrors §5's "single dispatcher or mutex
//! held for the full mutate-and-emit sequence" without requiring an actor
//! layer on top.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::model::{EpochMs, Notification, NotificationKind, PrInfo, Session, SessionStatus};
use crate::status::derive_status;
use crate::tailer::TailEvent;

/// A registry mutation worth telling subscribers about.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Created(Session),
    Updated(Session),
    Deleted { session_id: String },
}

pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    hostname: String,
    idle_timeout_ms: i64,
    log_suffix: String,
    max_age_ms: i64,
}

impl SessionRegistry {
    pub fn new(hostname: impl Into<String>, idle_timeout_ms: i64, log_suffix: impl Into<String>) -> Self {
        Self {
            sessions: HashMap::new(),
            hostname: hostname.into(),
            idle_timeout_ms,
            log_suffix: log_suffix.into(),
            max_age_ms: i64::MAX,
        }
    }

    /// §6: `MAX_AGE_HOURS` — sessions whose `started_at` is older than this
    /// many milliseconds are filtered out of publish. The session is still
    /// tracked (supersession and timers still apply to it); only the
    /// outgoing `created`/`updated` events are suppressed.
    pub fn with_max_age_ms(mut self, max_age_ms: i64) -> Self {
        self.max_age_ms = max_age_ms;
        self
    }

    /// Free of `&self` on purpose: callers hold a live `&mut Session`
    /// borrowed out of `self.sessions` and a method taking `&self` would
    /// conflict with it.
    fn within_publish_age(max_age_ms: i64, session: &Session, now: EpochMs) -> bool {
        now.saturating_sub(session.started_at) <= max_age_ms
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Derive a session id from a log file's path: the filename segment
    /// before the configured suffix.
    fn session_id_for(&self, path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        name.strip_suffix(&self.log_suffix).map(str::to_owned)
    }

    /// Feed one tailer observation into the registry, returning whatever
    /// registry events it produced (zero, one, or — when supersession
    /// fires — several).
    pub fn handle_tail_event(&mut self, event: TailEvent, now: EpochMs) -> Vec<RegistryEvent> {
        match event {
            TailEvent::Added { .. } => Vec::new(),
            TailEvent::Error { path, detail } => {
                debug!(path = %path.display(), %detail, "tailer reported a file error");
                Vec::new()
            }
            TailEvent::Unlinked { path } => {
                let Some(session_id) = self.session_id_for(&path) else { return Vec::new() };
                self.delete(&session_id)
            }
            TailEvent::Changed { path, entries, metadata, byte_position } => {
                let Some(session_id) = self.session_id_for(&path) else { return Vec::new() };
                self.apply_change(session_id, entries, metadata, byte_position, now)
            }
        }
    }

    fn apply_change(
        &mut self,
        session_id: String,
        new_entries: Vec<crate::model::RawEntry>,
        metadata: crate::parser::SessionMetadata,
        byte_position: u64,
        now: EpochMs,
    ) -> Vec<RegistryEvent> {
        let is_new = !self.sessions.contains_key(&session_id);
        let idle_timeout_ms = self.idle_timeout_ms;
        let max_age_ms = self.max_age_ms;
        let hostname = self.hostname.clone();

        let session = match self.sessions.entry(session_id.clone()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                // Metadata must be complete (cwd + start time) before the
                // session exists publicly — §4.4 step 2.
                let (Some(cwd), Some(started_at)) = (metadata.cwd.clone(), metadata.started_at) else {
                    return Vec::new();
                };
                e.insert(Session {
                    session_id: session_id.clone(),
                    hostname,
                    cwd,
                    git_branch: metadata.git_branch.clone(),
                    git_repo_id: None,
                    original_prompt: metadata.original_prompt.clone().unwrap_or_default(),
                    started_at,
                    last_activity_at: now,
                    status: SessionStatus::Working,
                    message_count: 0,
                    has_pending_tool_use: false,
                    pending_tool: None,
                    entries: Default::default(),
                    byte_position: 0,
                    goal: metadata.original_prompt.clone().unwrap_or_default(),
                    summary: None,
                    pr: None,
                    notification: None,
                })
            }
        };

        let mut events = Vec::new();
        let prev_status = session.status;

        for entry in new_entries {
            if let Some(text) = entry.text.as_deref() {
                if !text.trim().is_empty() && matches!(entry.role, crate::model::Role::User) {
                    session.goal = text.trim().to_owned();
                }
            }
            session.entries.push_back(entry);
        }
        session.byte_position = byte_position;
        if let Some(branch) = metadata.git_branch {
            session.git_branch.get_or_insert(branch);
        }

        let prev_message_count = session.message_count;
        let tuple = derive_status(session.entries.make_contiguous(), now, idle_timeout_ms);
        let message_count_increased = tuple.message_count > prev_message_count;
        let status_changed = tuple.status != prev_status;

        session.notification = if prev_status == SessionStatus::Working && tuple.status == SessionStatus::Waiting
        {
            let kind = if tuple.has_pending_tool_use {
                NotificationKind::NeedsApproval
            } else {
                NotificationKind::WaitingForInput
            };
            Some(Notification { kind, timestamp: now })
        } else {
            None
        };

        session.apply_status(tuple);

        if Self::within_publish_age(max_age_ms, session, now) {
            if is_new {
                events.push(RegistryEvent::Created(session.clone()));
            } else if status_changed || message_count_increased {
                events.push(RegistryEvent::Updated(session.clone()));
            }
        }

        if is_new {
            events.extend(self.supersede(&session_id));
        }

        events
    }

    /// Delete every other idle session sharing this session's hostname+cwd.
    fn supersede(&mut self, new_session_id: &str) -> Vec<RegistryEvent> {
        let Some(new_session) = self.sessions.get(new_session_id) else { return Vec::new() };
        let hostname = new_session.hostname.clone();
        let cwd = new_session.cwd.clone();

        let victims: Vec<String> = self
            .sessions
            .values()
            .filter(|s| {
                s.session_id != new_session_id
                    && s.hostname == hostname
                    && s.cwd == cwd
                    && s.status == SessionStatus::Idle
            })
            .map(|s| s.session_id.clone())
            .collect();

        victims.into_iter().flat_map(|id| self.delete(&id)).collect()
    }

    fn delete(&mut self, session_id: &str) -> Vec<RegistryEvent> {
        if self.sessions.remove(session_id).is_some() {
            vec![RegistryEvent::Deleted { session_id: session_id.to_owned() }]
        } else {
            Vec::new()
        }
    }

    /// §4.12: record the Git/PR/CI Poller's result for a session, emitting
    /// `updated` when the session is still present. A no-op (not a deletion)
    /// when the session has since been evicted — the poller's tick may race
    /// with supersession.
    pub fn set_pr(&mut self, session_id: &str, pr: Option<PrInfo>) -> Option<RegistryEvent> {
        let session = self.sessions.get_mut(session_id)?;
        session.pr = pr;
        Some(RegistryEvent::Updated(session.clone()))
    }

    /// §4.11: record the Summary Generator's result for a session.
    pub fn set_summary(&mut self, session_id: &str, summary: Option<String>) -> Option<RegistryEvent> {
        let session = self.sessions.get_mut(session_id)?;
        session.summary = summary;
        Some(RegistryEvent::Updated(session.clone()))
    }

    /// Re-evaluate every `working` session against the current clock,
    /// publishing `updated` for any whose status changed. Drives the
    /// fast-idle and pending-tool timeouts without file activity (§4.8).
    pub fn recheck_timers(&mut self, now: EpochMs) -> Vec<RegistryEvent> {
        let mut events = Vec::new();
        let ids: Vec<String> = self
            .sessions
            .values()
            .filter(|s| s.status == SessionStatus::Working)
            .map(|s| s.session_id.clone())
            .collect();

        for id in ids {
            let Some(session) = self.sessions.get_mut(&id) else { continue };
            let prev_status = session.status;
            let tuple = derive_status(session.entries.make_contiguous(), now, self.idle_timeout_ms);
            if tuple.status != prev_status {
                session.notification = if prev_status == SessionStatus::Working
                    && tuple.status == SessionStatus::Waiting
                {
                    let kind = if tuple.has_pending_tool_use {
                        NotificationKind::NeedsApproval
                    } else {
                        NotificationKind::WaitingForInput
                    };
                    Some(Notification { kind, timestamp: now })
                } else {
                    None
                };
                session.apply_status(tuple);
                if Self::within_publish_age(self.max_age_ms, session, now) {
                    events.push(RegistryEvent::Updated(session.clone()));
                }
            }
        }
        events
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
