use super::*;

#[test]
fn seq_is_monotonic_and_gap_free() {
    let pub_ = StatePublisher::new(None).unwrap();
    let a = pub_.publish(ChangeOp::Insert, "s1".into(), None);
    let b = pub_.publish(ChangeOp::Update, "s1".into(), None);
    let c = pub_.publish(ChangeOp::Insert, "s2".into(), None);
    assert_eq!([a.seq, b.seq, c.seq], [1, 2, 3]);
}

#[test]
fn subscriber_receives_live_records() {
    let pub_ = StatePublisher::new(None).unwrap();
    let mut rx = pub_.subscribe();
    pub_.publish(ChangeOp::Insert, "s1".into(), None);
    let received = rx.try_recv().unwrap();
    assert_eq!(received.pk, "s1");
    assert_eq!(received.seq, 1);
}

#[test]
fn catchup_returns_only_records_after_since_seq() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stream.jsonl");
    let pub_ = StatePublisher::new(Some(path)).unwrap();
    pub_.publish(ChangeOp::Insert, "s1".into(), None);
    pub_.publish(ChangeOp::Update, "s1".into(), None);
    pub_.publish(ChangeOp::Delete, "s1".into(), None);

    let resumed = pub_.catchup(1);
    assert_eq!(resumed.len(), 2);
    assert_eq!(resumed[0].seq, 2);
    assert_eq!(resumed[1].seq, 3);
}

#[test]
fn catchup_with_no_log_path_is_empty() {
    let pub_ = StatePublisher::new(None).unwrap();
    pub_.publish(ChangeOp::Insert, "s1".into(), None);
    assert!(pub_.catchup(0).is_empty());
}
