//! Error handling integration tests for fcp CLI.
//!
//! These tests verify proper error handling behaviors:
//! - Failure messages follow `<action> with following reason: [<reason>]`
//! - Best-effort keeps healthy destinations and warns about the rest
//! - Fail-fast stops at the first failing destination
//! - Exit codes distinguish failures from usage errors

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestFixture, payload};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[test]
fn test_source_not_found() {
    let fx = TestFixture::new();
    let missing = fx.src.path().join("missing.txt");

    cargo_bin_cmd!("fcp")
        .arg(&missing)
        .arg(fx.dest("out.txt"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "fcp: Reading from source URL: [{}] failed with following reason: [",
            missing.display()
        )));

    // No target is opened when the source cannot be
    assert!(!fx.dest("out.txt").exists());
}

#[test]
fn test_best_effort_keeps_healthy_target() {
    let fx = TestFixture::new();
    let data = payload(50_000);
    let src = fx.source_file("data.bin", &data);
    let bad = fx.blocked_dest("data.bin");

    cargo_bin_cmd!("fcp")
        .arg("-q")
        .arg(&src)
        .arg(fx.dest("good.bin"))
        .arg(&bad)
        .assert()
        .success()
        .stderr(predicate::str::contains(format!(
            "fcp: warning: Opening target URL: [{}] failed with following reason: [",
            bad.display()
        )));

    fx.assert_file_content(&fx.dest("good.bin"), &data);
}

#[test]
fn test_best_effort_all_targets_failing() {
    let fx = TestFixture::new();
    let src = fx.source_file("data.bin", b"data");
    let bad_a = fx.blocked_dest("a");
    let bad_b = fx.blocked_dest("b");

    cargo_bin_cmd!("fcp")
        .arg("-q")
        .arg(&src)
        .arg(&bad_a)
        .arg(&bad_b)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("fcp: Opening target URL:"))
        .stderr(predicate::str::contains("fcp: warning:").not());
}

#[test]
fn test_fail_fast_stops_at_first_failing_target() {
    let fx = TestFixture::new();
    let src = fx.source_file("data.bin", &payload(1000));
    let bad = fx.blocked_dest("data.bin");

    cargo_bin_cmd!("fcp")
        .args(["-q", "--fail-fast"])
        .arg(&src)
        .arg(&bad)
        .arg(fx.dest("never.bin"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains(format!(
            "fcp: Opening target URL: [{}] failed",
            bad.display()
        )));

    assert!(!fx.dest("never.bin").exists());
}

#[test]
fn test_fail_fast_atomic_leaves_no_partial_target() {
    let fx = TestFixture::new();
    let src = fx.source_file("data.bin", &payload(1000));
    let bad = fx.blocked_dest("data.bin");

    cargo_bin_cmd!("fcp")
        .args(["-q", "--fail-fast", "--atomic"])
        .arg(&src)
        .arg(fx.dest("first.bin"))
        .arg(&bad)
        .assert()
        .code(1);

    // first.bin was opened before the failure, then discarded
    assert!(!fx.dest("first.bin").exists());
}

#[test]
fn test_failure_reported_in_json() {
    let fx = TestFixture::new();
    let src = fx.source_file("data.bin", b"abc");
    let bad = fx.blocked_dest("x");

    let output = cargo_bin_cmd!("fcp")
        .args(["--output", "json", "--fail-fast"])
        .arg(&src)
        .arg(&bad)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "failed");
    let error = &value["jobs"][0]["errors"][0];
    assert_eq!(error["kind"], "target_open");
    assert_eq!(error["phase"], "open");
    assert_eq!(error["url"], bad.display().to_string());
    assert_eq!(error["job"], src.display().to_string());
    assert_eq!(error["no_space"], false);
}

#[test]
fn test_directory_without_recursive_flag() {
    let fx = TestFixture::new();
    fs::create_dir_all(fx.src.path().join("mydir")).unwrap();

    cargo_bin_cmd!("fcp")
        .arg(fx.src.path().join("mydir"))
        .arg(fx.dest("mydir"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("-r/--recursive"));
}

#[test]
fn test_missing_target_is_usage_error() {
    let fx = TestFixture::new();
    let src = fx.source_file("a.txt", b"a");

    cargo_bin_cmd!("fcp").arg(&src).assert().code(2);
}

#[test]
fn test_directory_target_is_file_is_usage_error() {
    let fx = TestFixture::new();
    fx.source_file("d/a.txt", b"a");
    let file_target = fx.dest("plain");
    fs::write(&file_target, "x").unwrap();

    cargo_bin_cmd!("fcp")
        .arg("-r")
        .arg(fx.src.path().join("d"))
        .arg(&file_target)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("is not a directory"));
}

#[cfg(target_os = "linux")]
#[test]
fn test_full_device_reported_as_no_space() {
    // Every write to /dev/full fails with ENOSPC
    let full = Path::new("/dev/full");
    if !full.exists() {
        eprintln!("Skipping: /dev/full not available");
        return;
    }
    let fx = TestFixture::new();
    let data = payload(4096);
    let src = fx.source_file("data.bin", &data);

    let output = cargo_bin_cmd!("fcp")
        .args(["--output", "json", "--no-sync"])
        .arg(&src)
        .arg(fx.dest("ok.bin"))
        .arg(full)
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    let errors = value["jobs"][0]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["kind"], "target_write");
    assert_eq!(errors[0]["url"], "/dev/full");
    assert_eq!(errors[0]["no_space"], true);
    fx.assert_file_content(&fx.dest("ok.bin"), &data);

    cargo_bin_cmd!("fcp")
        .args(["-q", "--no-sync"])
        .arg(&src)
        .arg(full)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("fcp: Writing to target URL: [/dev/full] failed"))
        .stderr(predicate::str::contains("fcp: hint: free up space"));
}
