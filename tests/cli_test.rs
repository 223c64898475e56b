//! CLI-level coverage that doesn't require a real `7z` binary or DMG fixture.
//!
//! Anything past argument validation hits the DMG stage, which shells out to
//! `7z`; that stage (and the full pipeline through it) is covered at the
//! library level in `tests/pipeline_test.rs` instead.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn missing_dmg_path_exits_nonzero_with_diagnostic() {
    let mut cmd = Command::cargo_bin("macsdk-fetch").unwrap();
    cmd.arg("/nonexistent/path/to/clt.dmg");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("input not found"));
}

#[test]
fn help_flag_prints_usage() {
    let mut cmd = Command::cargo_bin("macsdk-fetch").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Command Line Tools"));
}

#[test]
fn missing_positional_argument_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("macsdk-fetch").unwrap();
    cmd.assert().failure().code(2);
}
