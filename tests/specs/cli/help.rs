//! CLI help specs
//!
//! Verify help and version output.

use crate::prelude::*;

#[test]
fn help_lists_commands() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("status")
        .stdout_has("clear");
}

#[test]
fn run_help_lists_lock_options() {
    let temp = Project::empty();
    temp.kvl()
        .args(&["run", "--help"])
        .passes()
        .stdout_has("--lease")
        .stdout_has("--wait")
        .stdout_has("--mode");
}

#[test]
fn version_flag() {
    let temp = Project::empty();
    temp.kvl().args(&["--version"]).passes().stdout_has("kvl");
}
