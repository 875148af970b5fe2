// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn files_command_categorizes_project() {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("src")).expect("mkdir");
    fs::write(dir.path().join("src/a.cpp"), "int main() { return 0; }\n").expect("write");
    fs::write(dir.path().join("src/b.cc"), "void f() {}\n").expect("write");
    fs::write(dir.path().join("src/c.hpp"), "void f();\n").expect("write");
    fs::write(dir.path().join("CMakeLists.txt"), "project(x)\n").expect("write");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("coba"));
    cmd.current_dir(dir.path())
        .args(["files", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("C++ Project File Summary:"))
        .stdout(predicate::str::contains("Detected C++ Source Files: 2"))
        .stdout(predicate::str::contains("Detected C++ Header Files: 1"))
        .stdout(predicate::str::contains("Other Files: 1"))
        .stdout(predicate::str::contains("Total Files: 4"));
}

#[test]
fn files_command_rejects_file_path() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("a.cpp");
    fs::write(&file, "int main() { return 0; }\n").expect("write");

    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("coba"));
    cmd.current_dir(dir.path())
        .arg("files")
        .arg(&file)
        .assert()
        .failure();
}

#[test]
fn completions_are_generated() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("coba"));
    cmd.args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("coba"));
}
