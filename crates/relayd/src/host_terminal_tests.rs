use super::*;

#[tokio::test]
async fn null_host_never_reports_success() {
    let host = NullHost;
    assert!(!host.focus(None).await);
    assert!(!host.focus(Some("term")).await);
    assert!(!host.open("/tmp", "echo hi").await);
}

#[test]
fn resolve_falls_back_to_null_host_for_unset_or_unknown() {
    let _ = resolve(None);
    let _ = resolve(Some("none"));
    let _ = resolve(Some("something-unrecognized"));
}
