use super::*;

#[test]
fn summarize_checks_is_none_when_empty() {
    assert_eq!(summarize_checks(vec![]), "none");
}

#[test]
fn summarize_checks_is_passing_when_all_succeed() {
    let checks = vec![
        GhCheck { conclusion: Some("success".to_owned()) },
        GhCheck { conclusion: Some("success".to_owned()) },
    ];
    assert_eq!(summarize_checks(checks), "passing");
}

#[test]
fn summarize_checks_is_failing_when_any_fails() {
    let checks = vec![
        GhCheck { conclusion: Some("success".to_owned()) },
        GhCheck { conclusion: Some("failure".to_owned()) },
    ];
    assert_eq!(summarize_checks(checks), "failing");
}

#[test]
fn summarize_checks_is_pending_otherwise() {
    let checks = vec![GhCheck { conclusion: None }];
    assert_eq!(summarize_checks(checks), "pending");
}

#[tokio::test]
async fn poll_returns_none_outside_a_git_repo() {
    let dir = tempfile::tempdir().unwrap();
    if gh_available() {
        assert!(poll(dir.path().to_str().unwrap()).await.is_none());
    }
}
