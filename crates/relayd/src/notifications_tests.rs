use super::*;

#[test]
fn null_sink_never_panics() {
    let sink = NullSink;
    let notification = Notification { kind: NotificationKind::WaitingForInput, timestamp: 0 };
    sink.notify("session-1", &notification);
}

#[test]
fn resolve_picks_sink_by_flag() {
    let _ = resolve(false);
    let _ = resolve(true);
}
