use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn cascade_cmd() -> Command {
    Command::cargo_bin("cascade").unwrap()
}

#[test]
fn test_march_lists_targets() {
    cascade_cmd()
        .arg("march")
        .assert()
        .success()
        .stdout(predicate::str::contains("minimal"))
        .stdout(predicate::str::contains("sw"));
}

#[test]
fn test_version() {
    cascade_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("cascade"));
}
