use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn cascade_cmd() -> Command {
    Command::cargo_bin("cascade").unwrap()
}

#[test]
fn test_fmt_prints_canonical_text() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("a.v");
    fs::write(&file, "initial begin if (x) y = 1; else y = 2; end").unwrap();

    cascade_cmd()
        .arg("fmt")
        .arg(&file)
        .assert()
        .success()
        .stdout("initial begin\n  if (x)\n    y = 1;\n  else\n    y = 2;\nend\n");
}

#[test]
fn test_fmt_check() {
    let tmp = TempDir::new().unwrap();
    let messy = tmp.path().join("messy.v");
    let clean = tmp.path().join("clean.v");
    fs::write(&messy, "assign x = 8'hFF;").unwrap();
    fs::write(&clean, "assign x = 8'hff;\n").unwrap();

    cascade_cmd()
        .args(["fmt", "--check"])
        .arg(&messy)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unformatted"));

    cascade_cmd()
        .args(["fmt", "--check"])
        .arg(&clean)
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_fmt_parse_error() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("bad.v");
    fs::write(&file, "module M(; endmodule").unwrap();

    cascade_cmd().arg("fmt").arg(&file).assert().failure();
}

#[test]
fn test_fmt_missing_file() {
    cascade_cmd()
        .args(["fmt", "/no/such/file.v"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O error"));
}
