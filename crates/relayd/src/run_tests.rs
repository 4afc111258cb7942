use clap::Parser;
use serial_test::serial;

use super::*;

#[test]
#[serial]
fn default_log_root_joins_home_and_claude_projects() {
    std::env::set_var("HOME", "/tmp/relayd-home-test");
    assert_eq!(default_log_root(), PathBuf::from("/tmp/relayd-home-test/.claude/projects"));
}

#[test]
#[serial]
fn default_log_root_falls_back_when_home_unset() {
    let prev = std::env::var_os("HOME");
    std::env::remove_var("HOME");
    assert_eq!(default_log_root(), PathBuf::from("./.claude/projects"));
    if let Some(home) = prev {
        std::env::set_var("HOME", home);
    }
}

#[test]
fn init_tracing_does_not_panic_for_either_log_format() {
    let mut config = Config::parse_from(["relayd", "serve"]);
    config.log_format = "text".to_owned();
    init_tracing(&config);

    let mut config = Config::parse_from(["relayd", "serve"]);
    config.log_format = "json".to_owned();
    init_tracing(&config);
}

#[test]
fn init_tracing_falls_back_to_info_on_garbage_log_level() {
    let mut config = Config::parse_from(["relayd", "serve"]);
    config.log_level = "not-a-level".to_owned();
    init_tracing(&config);
}
