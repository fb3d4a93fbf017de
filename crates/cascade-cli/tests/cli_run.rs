use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn cascade_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cascade").unwrap();
    cmd.env("CASCADE_HOME", home.path());
    cmd
}

#[test]
fn test_run_batch_prints_output() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("hello.v");
    fs::write(&file, "initial begin $display(\"Hello World\"); $finish; end\n").unwrap();

    cascade_cmd(&tmp)
        .args(["run", "--batch", "-e"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello World"))
        .stdout(predicate::str::contains("Goodbye!"));
}

#[test]
fn test_run_batch_clocked_counter() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("count.v");
    fs::write(
        &file,
        "reg [7:0] n = 0;
         always @(posedge clock.val) begin
           n <= n + 1;
           if (n == 20) begin $display(\"n=%0d\", n); $finish; end
         end\n",
    )
    .unwrap();

    cascade_cmd(&tmp)
        .args(["run", "--batch", "--open-loop-target", "0", "-e"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("n=20"));
}

#[test]
fn test_run_batch_parse_error_fails() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("bad.v");
    fs::write(&file, "reg [3:0] = ;\n").unwrap();

    cascade_cmd(&tmp)
        .args(["run", "--batch", "-e"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("*** Parse Error:"));
}

#[test]
fn test_run_batch_missing_file_fails() {
    let tmp = TempDir::new().unwrap();

    cascade_cmd(&tmp)
        .args(["run", "--batch", "-e", "nowhere.v"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to locate file"));
}

#[test]
fn test_run_include_dirs() {
    let tmp = TempDir::new().unwrap();
    let lib = tmp.path().join("lib");
    fs::create_dir(&lib).unwrap();
    fs::write(lib.join("top.v"), "initial begin $display(\"found\"); $finish; end\n").unwrap();

    cascade_cmd(&tmp)
        .args(["run", "--batch", "-e", "top.v", "-I"])
        .arg(&lib)
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("found"));
}

#[test]
fn test_run_unknown_march_fails() {
    let tmp = TempDir::new().unwrap();

    cascade_cmd(&tmp)
        .args(["run", "--batch", "--march", "de10"])
        .assert()
        .failure();
}

#[test]
fn test_run_repl_reads_stdin() {
    let tmp = TempDir::new().unwrap();

    cascade_cmd(&tmp)
        .args(["run"])
        .write_stdin("initial begin\n  $display(\"piped\");\n  $finish;\nend\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("piped"))
        .stdout(predicate::str::contains("Goodbye!"));
}

#[test]
fn test_run_repl_ctrl_d() {
    let tmp = TempDir::new().unwrap();

    cascade_cmd(&tmp)
        .args(["run"])
        .write_stdin("")
        .assert()
        .success()
        .stderr(predicate::str::contains("Caught Ctrl-D."))
        .stdout(predicate::str::contains("Goodbye!"));
}

const PAD_PROGRAM: &str = "reg [3:0] n = 0;
always @(posedge clock.val) begin
  n <= n + 1;
  if (n == 3) begin $display(\"pad=%0d\", pad.val); $finish; end
end
";

#[test]
fn test_run_uses_config_file() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("config.toml"),
        "[runtime]\nmarch = \"sw\"\n\n[ui]\ncolor = false\n",
    )
    .unwrap();
    let file = tmp.path().join("pad.v");
    fs::write(&file, PAD_PROGRAM).unwrap();

    cascade_cmd(&tmp)
        .args(["run", "--batch", "-e"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("pad=0"));
}

#[test]
fn test_run_march_flag_overrides_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[runtime]\nmarch = \"sw\"\n").unwrap();
    let file = tmp.path().join("pad.v");
    fs::write(&file, PAD_PROGRAM).unwrap();

    cascade_cmd(&tmp)
        .args(["run", "--batch", "--march", "minimal", "-e"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("*** Typechecker Error:"));
}
