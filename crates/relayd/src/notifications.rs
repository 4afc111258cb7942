// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! §4.13: desktop notifications on `working -> waiting` transitions.
//! Gated by `NOTIFICATIONS_ENABLED`; a no-op sink otherwise so callers never
//! need to branch on whether the capability is active.

use relay_core::{Notification, NotificationKind};
use tracing::warn;

pub trait NotificationSink: Send + Sync {
    fn notify(&self, session_id: &str, notification: &Notification);
}

/// Fires a real desktop notification via `notify-rust`.
pub struct DesktopNotifier;

impl NotificationSink for DesktopNotifier {
    fn notify(&self, session_id: &str, notification: &Notification) {
        let summary = match notification.kind {
            NotificationKind::WaitingForInput => "Session waiting for input",
            NotificationKind::NeedsApproval => "Session needs approval",
        };
        let body = format!("Session {session_id}");
        if let Err(e) = notify_rust::Notification::new().summary(summary).body(&body).show() {
            warn!("failed to show desktop notification: {e}");
        }
    }
}

/// Does nothing; used when `NOTIFICATIONS_ENABLED=false` or the platform has
/// no notification server.
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&self, _session_id: &str, _notification: &Notification) {}
}

pub fn resolve(enabled: bool) -> Box<dyn NotificationSink> {
    if enabled {
        Box::new(DesktopNotifier)
    } else {
        Box::new(NullSink)
    }
}

#[cfg(test)]
#[path = "notifications_tests.rs"]
mod tests;
