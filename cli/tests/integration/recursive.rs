//! Recursive copy integration tests for fcp CLI.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::{TestFixture, payload};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;

#[test]
fn test_recursive_copy_to_two_roots() {
    let fx = TestFixture::new();
    fx.source_file("file1.txt", b"content1");
    fx.source_file("subdir/file2.txt", b"content2");
    fx.source_file("subdir/nested/file3.bin", &payload(70_000));

    cargo_bin_cmd!("fcp")
        .args(["-r", "-q"])
        .arg(fx.src.path())
        .arg(fx.dest("a"))
        .arg(fx.dest("b"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 3 files"));

    for root in ["a", "b"] {
        let root = fx.dest(root);
        fx.assert_file_content(&root.join("file1.txt"), b"content1");
        fx.assert_file_content(&root.join("subdir/file2.txt"), b"content2");
        fx.assert_file_content(&root.join("subdir/nested/file3.bin"), &payload(70_000));
    }
}

#[test]
fn test_recursive_sequential_and_parallel_agree() {
    let fx = TestFixture::new();
    fx.create_nested_structure(4, 5);

    for (jobs, root) in [("1", "seq"), ("8", "par")] {
        cargo_bin_cmd!("fcp")
            .args(["-r", "-q", "-j", jobs])
            .arg(fx.src.path())
            .arg(fx.dest(root))
            .assert()
            .success();
    }

    assert_eq!(fx.count_files_recursive(&fx.dest("seq")), 20);
    assert_eq!(fx.count_files_recursive(&fx.dest("par")), 20);
    fx.assert_file_content(
        &fx.dest("par/level0/level1/level2/level3/file4.txt"),
        b"content at level 3",
    );
}

#[test]
fn test_recursive_max_depth() {
    let fx = TestFixture::new();
    fx.create_nested_structure(3, 1);

    cargo_bin_cmd!("fcp")
        .args(["-r", "-q", "--max-depth", "1"])
        .arg(fx.src.path())
        .arg(fx.dest("out"))
        .assert()
        .success()
        .stderr(predicate::str::contains("maximum depth"));

    assert!(fx.dest("out/level0/file0.txt").exists());
    assert!(!fx.dest("out/level0/level1").exists());
}

#[test]
fn test_recursive_one_bad_file_does_not_stop_others() {
    let fx = TestFixture::new();
    fx.source_file("a.txt", b"a");
    fx.source_file("b.txt", b"b");
    fx.source_file("c.txt", b"c");
    // In root "x", b.txt is already a directory and cannot be replaced
    fs::create_dir_all(fx.dest("x/b.txt")).unwrap();

    cargo_bin_cmd!("fcp")
        .args(["-r", "-q", "--fail-fast", "-j", "1"])
        .arg(fx.src.path())
        .arg(fx.dest("x"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Opening target URL:"))
        .stderr(predicate::str::contains("b.txt"));

    fx.assert_file_content(&fx.dest("x/a.txt"), b"a");
    fx.assert_file_content(&fx.dest("x/c.txt"), b"c");
    assert!(fx.dest("x/b.txt").is_dir());
}

#[test]
fn test_recursive_best_effort_other_root_still_gets_file() {
    let fx = TestFixture::new();
    fx.source_file("a.txt", b"a");
    fx.source_file("b.txt", b"b");
    fs::create_dir_all(fx.dest("x/b.txt")).unwrap();

    let output = cargo_bin_cmd!("fcp")
        .args(["-r", "--output", "json"])
        .arg(fx.src.path())
        .arg(fx.dest("x"))
        .arg(fx.dest("y"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "ok");
    assert_eq!(value["summary"]["jobs_succeeded"], 2);
    assert_eq!(value["summary"]["target_errors"], 1);
    fx.assert_file_content(&fx.dest("y/b.txt"), b"b");
}

#[test]
fn test_recursive_empty_directory() {
    let fx = TestFixture::new();

    cargo_bin_cmd!("fcp")
        .args(["-r", "-q"])
        .arg(fx.src.path())
        .arg(fx.dest("out"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to copy"));
}

#[cfg(unix)]
#[test]
fn test_recursive_skips_symlinks_with_warning() {
    use std::os::unix::fs::symlink;

    let fx = TestFixture::new();
    let real = fx.source_file("real.txt", b"real");
    symlink(&real, fx.src.path().join("link.txt")).unwrap();

    cargo_bin_cmd!("fcp")
        .args(["-r", "-q"])
        .arg(fx.src.path())
        .arg(fx.dest("out"))
        .assert()
        .success()
        .stderr(predicate::str::contains("fcp: warning: Skipping symlink"));

    fx.assert_file_content(&fx.dest("out/real.txt"), b"real");
    assert!(!fx.dest("out/link.txt").exists());
}
