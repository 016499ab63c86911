//! Integration tests for the hidden worker mode
//!
//! The launcher starts `histofan worker ...` for every input; these tests
//! drive that entry point directly and inspect the raw channel bytes.

use assert_cmd::Command;
use histofan::histogram::{Histogram, PAYLOAD_LEN};
use std::fs;
use tempfile::TempDir;

fn worker() -> Command {
    let mut cmd = Command::cargo_bin("histofan").unwrap();
    cmd.arg("worker").arg("--index").arg("0");
    cmd
}

#[test]
fn test_worker_publishes_single_payload() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("abc.txt");
    fs::write(&input, "aabbcc").unwrap();

    let output = worker().arg("--input").arg(&input).output().unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(output.stdout.len(), PAYLOAD_LEN);
    assert_eq!(
        Histogram::decode(&output.stdout).unwrap(),
        Histogram::from_bytes(b"aabbcc")
    );
}

#[test]
fn test_worker_missing_input_exits_with_input_failure() {
    let dir = TempDir::new().unwrap();

    let output = worker()
        .arg("--input")
        .arg(dir.path().join("missing.txt"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_worker_hold_publishes_nothing() {
    let output = worker()
        .arg("--hold")
        .arg("--hold-limit-ms")
        .arg("50")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_worker_requires_input_or_hold() {
    worker().assert().failure();
}
