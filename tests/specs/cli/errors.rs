//! CLI error specs
//!
//! Bad input fails fast with a non-zero exit and a message on stderr.

use crate::prelude::*;

#[test]
fn unknown_store_scheme_fails() {
    let temp = Project::empty();
    temp.kvl_bare()
        .args(&["--store", "etcd://localhost:2379", "status", "orders"])
        .exits_with(1)
        .stderr_has("unsupported store url");
}

#[test]
fn missing_config_file_fails() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["--config", "absent.toml", "status", "orders"])
        .exits_with(1)
        .stderr_has("failed to read");
}

#[test]
fn invalid_config_value_fails() {
    let temp = Project::empty();
    temp.file("kvl.toml", "[transport]\nbatch_size = 0\n");
    temp.kvl()
        .args(&["--config", "kvl.toml", "status", "orders"])
        .exits_with(1)
        .stderr_has("transport.batch_size");
}

#[test]
fn run_without_command_is_a_usage_error() {
    let temp = Project::empty();
    temp.kvl().args(&["run", "orders"]).fails();
}

#[test]
fn unparseable_lease_is_a_usage_error() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["run", "orders", "--lease", "soon", "--", "true"])
        .fails()
        .stderr_has("--lease");
}

#[test]
fn watchdog_mode_needs_a_lease() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["run", "orders", "--mode", "watchdog", "--", "true"])
        .exits_with(1)
        .stderr_has("needs a lease");
}

#[test]
fn unknown_command_binary_fails() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["run", "orders", "--", "kvl-no-such-program"])
        .exits_with(1)
        .stderr_has("failed to start kvl-no-such-program");
}
