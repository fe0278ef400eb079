//! Lock run specs
//!
//! `kvl run` holds the lock for the lifetime of the command and exits with
//! the command's status.

use crate::prelude::*;
use std::time::{Duration, Instant};

#[test]
fn runs_command_and_passes_output_through() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["run", "orders", "--", "echo", "hello"])
        .passes()
        .stdout_eq("hello\n");
}

#[test]
fn exits_with_command_status() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["run", "orders", "--", "sh", "-c", "exit 3"])
        .exits_with(3);
}

#[test]
fn command_sees_lock_name_and_token() {
    let temp = Project::empty();
    let run = temp
        .kvl()
        .args(&["run", "orders", "--", "sh", "-c", "echo $KVL_LOCK; echo $KVL_TOKEN"])
        .passes();

    let stdout = run.stdout();
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("orders"));
    let token = lines.next().unwrap();
    assert!(token.starts_with("orders:"), "unexpected token {token}");
}

#[test]
fn wait_on_a_free_lock_acquires() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["run", "orders", "--wait", "1s", "--", "true"])
        .passes();
}

#[test]
fn notify_mode() {
    let temp = Project::empty();
    temp.file("kvl.toml", FAST_SETTINGS);
    temp.kvl()
        .args(&[
            "--config", "kvl.toml", "run", "orders", "--mode", "notify", "--", "echo", "done",
        ])
        .passes()
        .stdout_eq("done\n");
}

#[test]
fn watchdog_mode_within_lease() {
    let temp = Project::empty();
    temp.kvl()
        .args(&[
            "run", "orders", "--mode", "watchdog", "--lease", "5s", "--", "sh", "-c", "exit 4",
        ])
        .exits_with(4);
}

#[test]
fn watchdog_mode_kills_overrunning_command() {
    let temp = Project::empty();
    let started = Instant::now();
    temp.kvl()
        .args(&[
            "run", "orders", "--mode", "watchdog", "--lease", "200ms", "--", "sleep", "10",
        ])
        .exits_with(1)
        .stderr_has("interrupted");

    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn log_file_receives_debug_logs() {
    let temp = Project::empty();
    temp.kvl()
        .env("KVL_LOG", "debug")
        .args(&["--log-file", "logs/kvl.log", "run", "orders", "--", "true"])
        .passes();

    let logs = std::fs::read_to_string(temp.path().join("logs/kvl.log")).unwrap();
    assert!(logs.contains("lock acquired"), "logs:\n{logs}");
}
