use super::*;

#[test]
fn new_builds_a_client_with_any_nonempty_key() {
    assert!(SummaryClient::new("sk-ant-test-key").is_ok());
}
