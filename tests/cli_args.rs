//! CLI argument-validation smoke tests. Nothing here talks to a container
//! engine; every case fails or returns before the first engine call.

use std::{fs, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::tempdir;

fn soliscan() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("soliscan"))
}

#[test]
fn scan_requires_an_input_path() {
    soliscan()
        .arg("scan")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage").or(predicate::str::contains("required")));
}

#[test]
fn scan_rejects_missing_input() {
    soliscan()
        .args(["scan", "/nonexistent/source-set", "--no-summarize"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn scan_rejects_mythril_with_shared_exec_backend() -> anyhow::Result<()> {
    let dir = tempdir()?;
    fs::write(dir.path().join("A.sol"), "contract A {}")?;

    soliscan()
        .args([
            "scan",
            dir.path().to_str().unwrap(),
            "--analyzer",
            "mythril",
            "--backend",
            "shared-exec",
            "--no-summarize",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("shared-exec"));
    Ok(())
}

#[test]
fn scan_rejects_unknown_analyzer() {
    soliscan()
        .args(["scan", ".", "--analyzer", "securify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn analyzers_lists_images() {
    soliscan()
        .arg("analyzers")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("mythril/myth:latest")
                .and(predicate::str::contains("trailofbits/slither:latest")),
        );
}
