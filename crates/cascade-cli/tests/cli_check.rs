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
fn test_check_valid_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("ok.v");
    fs::write(
        &file,
        "module Inc(input wire [3:0] a, output wire [3:0] b);
           assign b = a + 1;
         endmodule
         reg [3:0] x = 1;
         wire [3:0] y;
         Inc inc(.a(x), .b(y));
         always @(posedge clock.val) $display(\"%d\", y);\n",
    )
    .unwrap();

    cascade_cmd(&tmp)
        .arg("check")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("1 file(s) checked"));
}

#[test]
fn test_check_duplicate_module_fails() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("dup.v");
    fs::write(&file, "module A(); endmodule\nmodule A(); endmodule\n").unwrap();

    cascade_cmd(&tmp)
        .arg("check")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("has already been declared"));
}

#[test]
fn test_check_parse_error_fails() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("bad.v");
    fs::write(&file, "assign = 3;\n").unwrap();

    cascade_cmd(&tmp).arg("check").arg(&file).assert().failure();
}

#[test]
fn test_check_stops_at_first_failure() {
    let tmp = TempDir::new().unwrap();
    let good = tmp.path().join("good.v");
    let bad = tmp.path().join("bad.v");
    fs::write(&good, "reg [3:0] x = 1;\n").unwrap();
    fs::write(&bad, "module A(); endmodule\nmodule A(); endmodule\n").unwrap();

    cascade_cmd(&tmp)
        .arg("check")
        .arg(&bad)
        .arg(&good)
        .assert()
        .failure()
        .stderr(predicate::str::contains("file(s) checked").not());
}

#[test]
fn test_check_sw_march_names() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("board.v");
    fs::write(&file, "assign led.val = pad.val;\n").unwrap();

    cascade_cmd(&tmp)
        .args(["check", "--march", "sw"])
        .arg(&file)
        .assert()
        .success();

    cascade_cmd(&tmp).arg("check").arg(&file).assert().failure();
}

#[test]
fn test_check_resolves_includes() {
    let tmp = TempDir::new().unwrap();
    let lib = tmp.path().join("lib");
    fs::create_dir(&lib).unwrap();
    fs::write(lib.join("defs.v"), "module Id(input wire a, output wire b); assign b = a; endmodule\n")
        .unwrap();
    let file = tmp.path().join("top.v");
    fs::write(&file, "`include \"defs.v\"\nreg i = 1;\nwire o;\nId id(.a(i), .b(o));\n").unwrap();

    cascade_cmd(&tmp)
        .arg("check")
        .arg(&file)
        .arg("-I")
        .arg(&lib)
        .assert()
        .success();

    cascade_cmd(&tmp)
        .arg("check")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to locate file defs.v"));
}

#[test]
fn test_check_requires_files() {
    let tmp = TempDir::new().unwrap();
    cascade_cmd(&tmp).arg("check").assert().failure();
}
