use std::io::Write;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::*;

fn write_lines(path: &Path, lines: &[&str]) {
    let mut f = std::fs::OpenOptions::new().create(true).append(true).open(path).unwrap();
    for line in lines {
        writeln!(f, "{line}").unwrap();
    }
}

#[tokio::test]
async fn emits_added_and_changed_for_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.jsonl");
    write_lines(&file, &[r#"{"type":"user","timestamp":0,"sessionId":"a","cwd":"/w","message":{"content":"hi"}}"#]);

    let tailer = LogTailer::new(vec![dir.path().to_path_buf()], ".jsonl", "sub-")
        .with_debounce(Duration::from_millis(10))
        .with_poll_interval(Duration::from_millis(20));
    let (tx, mut rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();
    let shutdown2 = shutdown.clone();
    tokio::spawn(tailer.run(tx, shutdown2));

    let mut saw_added = false;
    let mut saw_entry = false;
    for _ in 0..20 {
        match tokio::time::timeout(Duration::from_millis(200), rx.recv()).await {
            Ok(Some(TailEvent::Added { .. })) => saw_added = true,
            Ok(Some(TailEvent::Changed { entries, .. })) if !entries.is_empty() => saw_entry = true,
            Ok(Some(_)) => {}
            _ => break,
        }
        if saw_added && saw_entry {
            break;
        }
    }
    shutdown.cancel();
    assert!(saw_added, "expected an Added event");
    assert!(saw_entry, "expected a Changed event with entries");
}

#[test]
fn ignore_prefix_excludes_sub_session_files() {
    let tailer = LogTailer::new(vec![PathBuf::from("/tmp")], ".jsonl", "sub-");
    assert!(!tailer.is_tracked(Path::new("/tmp/sub-abc.jsonl")));
    assert!(tailer.is_tracked(Path::new("/tmp/abc.jsonl")));
    assert!(!tailer.is_tracked(Path::new("/tmp/abc.txt")));
}

#[test]
fn partial_trailing_line_is_not_consumed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.jsonl");
    std::fs::write(&file, b"{\"type\":\"user\",\"timestamp\":0,\"message\":{\"content\":\"hi\"}}\n{\"incomplete").unwrap();
    let (entries, _meta, offset) = read_new_lines(&file, 0).unwrap();
    assert_eq!(entries.len(), 1);
    let full_len = std::fs::metadata(&file).unwrap().len();
    assert!(offset < full_len);
}

#[test]
fn malformed_line_is_skipped_but_offset_advances() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.jsonl");
    std::fs::write(&file, b"not json\n{\"type\":\"user\",\"timestamp\":0,\"message\":{\"content\":\"hi\"}}\n").unwrap();
    let (entries, _meta, offset) = read_new_lines(&file, 0).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(offset, std::fs::metadata(&file).unwrap().len());
}
