use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::clock::FixedClock;
use crate::model::{ContentShape, RawEntry, Role};
use crate::parser::SessionMetadata;
use crate::registry::SessionRegistry;
use crate::tailer::TailEvent;

fn user_entry(text: &str, ts: i64) -> RawEntry {
    RawEntry { role: Role::User, content_shape: ContentShape::Text, timestamp: Some(ts), tool: None, target: None, text: Some(text.to_owned()) }
}

#[tokio::test]
async fn idle_timeout_publishes_an_update_without_file_activity() {
    let clock = FixedClock::new(0);
    let mut registry = SessionRegistry::new("host-a", 1_200_000, ".jsonl");
    registry.handle_tail_event(
        TailEvent::Changed {
            path: std::path::PathBuf::from("/logs/abc.jsonl"),
            entries: vec![user_entry("hi", 0)],
            metadata: SessionMetadata {
                session_id: None,
                cwd: Some("/work".into()),
                git_branch: None,
                original_prompt: Some("hi".into()),
                started_at: Some(0),
            },
            byte_position: 10,
        },
        0,
    );
    let registry = Arc::new(Mutex::new(registry));
    let publisher = Arc::new(crate::publisher::StatePublisher::new(None).unwrap());
    let mut rx = publisher.subscribe();

    let shutdown = CancellationToken::new();
    let reevaluator = PeriodicReevaluator::new(clock.clone()).with_interval(Duration::from_millis(10));
    let handle = tokio::spawn(reevaluator.run(registry.clone(), publisher.clone(), shutdown.clone()));

    clock.set_ms(2_000_000);
    let record = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
    assert_eq!(record.pk, "abc");

    shutdown.cancel();
    handle.await.unwrap();
}
