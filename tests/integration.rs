//! Integration tests for the divchain CLI.
//!
//! These run the real binary end to end: the controller spawns a worker copy
//! of itself and both talk over a fresh POSIX shared memory channel.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

/// Get a command for the divchain binary with a clean environment.
fn divchain() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("divchain").unwrap();
    for var in [
        "DIVCHAIN_OUTPUT",
        "DIVCHAIN_POLL_INTERVAL_MS",
        "DIVCHAIN_SETTLE_MS",
        "DIVCHAIN_LOG",
        "DIVCHAIN_LOG_LEVEL",
        "DIVCHAIN_LOG_FORMAT",
        "DIVCHAIN_LOG_FILE",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

/// A controller run writing results to `output`, with short delays.
fn run(output: &Path) -> Command {
    let mut cmd = divchain();
    cmd.args(["run", "--settle-ms", "20", "--poll-interval-ms", "2", "--output"])
        .arg(output);
    cmd
}

#[test]
fn test_help() {
    divchain()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("completions"))
        .stdout(predicate::str::contains("SHM_NAME").not());
}

#[test]
fn test_version() {
    divchain()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_completions_bash() {
    divchain()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("divchain"));
}

#[test]
fn test_worker_usage_error() {
    divchain()
        .args(["worker", "results.txt", "/div_shm_0"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("SEM_NAME"));
}

#[test]
fn test_worker_without_channel_fails() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");
    divchain()
        .args(["worker"])
        .arg(&output)
        .args(["/divchain_it_absent_shm", "/divchain_it_absent_sem"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Worker error"));
}

#[test]
fn test_chained_division() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");

    run(&output)
        .write_stdin("10 2 5\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Worker process started with PID: "))
        .stdout(predicate::str::contains("Enter numbers separated by spaces (e.g. 100 2 5)"))
        .stdout(predicate::str::contains("result: 1.000000 (written to file)"))
        .stdout(predicate::str::contains("Empty line entered. Shutting down."))
        .stdout(predicate::str::contains("Controller finished"));

    let log = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        log,
        "==Results of division==\nOperation: 10 / 2 / 5 = 1.000000\n"
    );
}

#[test]
fn test_several_requests_in_one_session() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");

    run(&output)
        .write_stdin("100 -4\n7\n+9 3\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("result: -25.000000 (written to file)"))
        .stdout(predicate::str::contains("error: need at least 2 numbers"))
        .stdout(predicate::str::contains("result: 3.000000 (written to file)"));

    let log = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        log,
        "==Results of division==\n\
         Operation: 100 / -4 = -25.000000\n\
         Operation: 9 / 3 = 3.000000\n"
    );
}

#[test]
fn test_division_by_zero_terminates_both() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");

    run(&output)
        .write_stdin("8 0 4\n10 2\n")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "error: division by zero. Processes terminating",
        ))
        .stdout(predicate::str::contains("result: 5.000000").not());

    let log = std::fs::read_to_string(&output).unwrap();
    assert!(log.starts_with("==Results of division==\n"));
    assert!(log.ends_with("Operation: 8 / 0 = error: division by zero\n"));
}

#[test]
fn test_too_few_numbers_keeps_session() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");

    run(&output)
        .write_stdin("7\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("error: need at least 2 numbers"))
        .stdout(predicate::str::contains("Empty line entered. Shutting down."));

    let log = std::fs::read_to_string(&output).unwrap();
    assert_eq!(log, "==Results of division==\n");
}

#[test]
fn test_blank_line_stops_immediately() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");

    run(&output)
        .write_stdin("\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Empty line entered. Shutting down."));

    let log = std::fs::read_to_string(&output).unwrap();
    assert_eq!(log, "==Results of division==\n");
}

#[test]
fn test_invalid_characters_stop_session() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");

    run(&output)
        .write_stdin("10 / 2\n8 4\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Error: input contains invalid characters. Shutting down.",
        ))
        .stdout(predicate::str::contains("result:").not());
}

#[test]
fn test_oversized_line_fails_closed() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");
    let mut line = "1 ".repeat(3000);
    line.push('\n');

    run(&output)
        .write_stdin(line)
        .assert()
        .success()
        .stderr(predicate::str::contains("does not fit in one frame"))
        .stdout(predicate::str::contains("result:").not());
}

#[test]
fn test_output_path_prompt() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("prompted.txt");

    let mut cmd = divchain();
    cmd.args(["run", "--settle-ms", "20", "--poll-interval-ms", "2"])
        .write_stdin(format!("{}\n9 3\n\n", output.display()))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Enter output file name: "))
        .stdout(predicate::str::contains("result: 3.000000"));

    let log = std::fs::read_to_string(&output).unwrap();
    assert!(log.contains("Operation: 9 / 3 = 3.000000"));
}

#[test]
fn test_output_path_from_env() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("from-env.txt");

    divchain()
        .env("DIVCHAIN_OUTPUT", &output)
        .args(["run", "--settle-ms", "20"])
        .write_stdin("6 3\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("result: 2.000000"));

    assert!(output.exists());
}

#[test]
fn test_unwritable_output_ends_session_with_failure() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("missing-dir").join("results.txt");

    run(&output)
        .write_stdin("10 2\n\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Worker error"));
}

#[test]
fn test_verbose_logs_go_to_stderr() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("results.txt");

    let mut cmd = run(&output);
    cmd.arg("-v")
        .write_stdin("10 2\n\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Shared channel created"))
        .stdout(predicate::str::contains("Shared channel").not());
}
