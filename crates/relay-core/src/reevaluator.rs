// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticks every `interval` and re-derives status for every `working` session,
//! so a session goes `waiting`/`idle` on the clock alone even when its log
//! file has gone quiet. Without this, a session that stops producing lines
//! mid-tool-use would show `working` forever.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::Clock;
use crate::model::ChangeOp;
use crate::publisher::StatePublisher;
use crate::registry::{RegistryEvent, SessionRegistry};

/// Default tick period per §4.8.
pub const DEFAULT_INTERVAL_MS: u64 = 2_000;

pub struct PeriodicReevaluator<C: Clock> {
    clock: C,
    interval: Duration,
}

impl<C: Clock> PeriodicReevaluator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, interval: Duration::from_millis(DEFAULT_INTERVAL_MS) }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run until `shutdown` is cancelled. `registry` is shared with the
    /// tailer's ingestion loop, which holds the same lock for the duration
    /// of each batch it applies — the two never mutate concurrently.
    pub async fn run(
        self,
        registry: Arc<Mutex<SessionRegistry>>,
        publisher: Arc<StatePublisher>,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("periodic re-evaluator shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let now = self.clock.now_ms();
                    let events = registry.lock().await.recheck_timers(now);
                    for event in events {
                        publish_event(&publisher, event);
                    }
                }
            }
        }
    }
}

/// Translate one registry event into a published change record. Shared with
/// the tailer's ingestion loop, which applies the identical translation to
/// the events `handle_tail_event` returns.
pub fn publish_event(publisher: &StatePublisher, event: RegistryEvent) {
    match event {
        RegistryEvent::Created(session) => {
            publisher.publish(ChangeOp::Insert, session.session_id.clone(), Some(session));
        }
        RegistryEvent::Updated(session) => {
            publisher.publish(ChangeOp::Update, session.session_id.clone(), Some(session));
        }
        RegistryEvent::Deleted { session_id } => {
            publisher.publish(ChangeOp::Delete, session_id, None);
        }
    }
}

#[cfg(test)]
#[path = "reevaluator_tests.rs"]
mod tests;
