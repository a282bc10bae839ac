use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn stencil(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("stencil").expect("stencil binary");
    cmd.env("HOME", home.path()).env("USERPROFILE", home.path());
    cmd
}

#[test]
fn dry_run_sync_reports_counts_and_writes_nothing() {
    let home = TempDir::new().unwrap();
    let tree = TempDir::new().unwrap();
    fs::write(tree.path().join("util.jslib"), "function util() {\n}\n").unwrap();
    fs::write(
        tree.path().join("orders.schema.json"),
        r#"{"table": "ORDERS", "columns": [{"name": "ID", "type": "INTEGER"}]}"#,
    )
    .unwrap();

    stencil(&home)
        .arg("sync")
        .arg(tree.path())
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"))
        .stdout(predicate::str::contains("2 generated"));

    assert!(
        !tree.path().join("util.exports.js").exists(),
        "dry-run must not create output files"
    );
    assert!(!tree.path().join("orders.sql").exists());
    let entries = fs::read_dir(tree.path()).unwrap().count();
    assert_eq!(entries, 2, "dry-run must not create any files");
}

#[test]
fn dry_run_does_not_touch_the_state_table() {
    let home = TempDir::new().unwrap();
    let tree = TempDir::new().unwrap();
    fs::write(tree.path().join("util.jslib"), "function util() {\n}\n").unwrap();

    stencil(&home)
        .arg("sync")
        .arg(tree.path())
        .arg("--dry-run")
        .assert()
        .success();

    // A real pass right after still classifies the artifact as new.
    stencil(&home)
        .arg("sync")
        .arg(tree.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("1 generated"));
    assert!(tree.path().join("util.exports.js").exists());
}
