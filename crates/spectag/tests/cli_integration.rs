//! Integration tests that run the spectag binary

mod common;

use std::process::Command;

fn spectag_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_spectag"))
}

#[test]
fn test_process_command() {
    let temp = common::create_temp_project();

    let output = spectag_bin()
        .arg("--root")
        .arg(temp.path())
        .arg("process")
        .output()
        .expect("Failed to run spectag");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command should succeed: {stdout}");
    assert!(stdout.contains("lib.rs"), "Should list the updated file: {stdout}");

    let written = std::fs::read_to_string(temp.path().join("src/lib.rs")).unwrap();
    assert!(written.contains("// +++ electra\n"));
}

#[test]
fn test_check_exits_non_zero() {
    let temp = common::create_temp_project();

    let output = spectag_bin()
        .arg("--root")
        .arg(temp.path())
        .arg("process")
        .arg("--check")
        .output()
        .expect("Failed to run spectag");

    assert!(!output.status.success(), "Check should fail when files would change");
    let untouched = std::fs::read_to_string(temp.path().join("src/lib.rs")).unwrap();
    assert_eq!(untouched, common::SOURCE);
}

#[test]
fn test_process_json() {
    let temp = common::create_temp_project();

    let output = spectag_bin()
        .arg("--root")
        .arg(temp.path())
        .arg("process")
        .arg("--format")
        .arg("json")
        .output()
        .expect("Failed to run spectag");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"updated\""), "Should report updates: {stdout}");
    assert!(stdout.contains("lib.rs"), "Should list the file: {stdout}");
}

#[test]
fn test_forks_command() {
    let temp = common::create_temp_project();
    std::fs::write(temp.path().join(".spectag.yml"), "forks:\n  - deneb\n  - electra\n").unwrap();

    let output = spectag_bin()
        .arg("--root")
        .arg(temp.path())
        .arg("forks")
        .output()
        .expect("Failed to run spectag");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("deneb") && stdout.contains("electra"));
    assert!(!stdout.contains("capella"));
}
