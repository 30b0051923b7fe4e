//! Integration tests for `unitmatch resolve`.
#![allow(clippy::expect_used)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Path to the compiled `unitmatch` binary.
fn unitmatch_bin() -> PathBuf {
    let mut path = std::env::current_exe().expect("current exe");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("unitmatch");
    path
}

/// Two subjects: `M1` resolves cleanly, `M2` lacks its only comparison.
const STUDY: &str = r#"{"subjects": [
    {"id": "M1", "sessions": [
        {"id": "day1", "sequence": 1, "labels": [1, 2, 3]},
        {"id": "day2", "sequence": 2, "labels": [1, 4]}
    ], "comparisons": [
        {"earlier": "day1", "later": "day2", "matches": [[1, 4]], "distances": [0.2],
         "unmatched_prev": [2, 3], "unmatched_curr": [1]}
    ]},
    {"id": "M2", "sessions": [
        {"id": "a", "sequence": 1}, {"id": "b", "sequence": 2}
    ]}
]}"#;

const CLEAN: &str = r#"{"subjects": [
    {"id": "M1", "sessions": [
        {"id": "day1", "sequence": 1, "labels": [1, 2]},
        {"id": "day2", "sequence": 2, "labels": [5]}
    ], "comparisons": [
        {"earlier": "day1", "later": "day2", "matches": [[2, 5]], "distances": [0.1],
         "unmatched_prev": [1]}
    ]}
]}"#;

fn write_study(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write study");
    file
}

fn run(args: &[&str], file: &tempfile::NamedTempFile) -> std::process::Output {
    Command::new(unitmatch_bin())
        .args(args)
        .arg(file.path())
        .output()
        .expect("run unitmatch")
}

#[test]
fn resolve_clean_study_exits_0() {
    let file = write_study(CLEAN);
    let out = run(&["resolve"], &file);
    assert!(out.status.success(), "exit code: {:?}", out.status.code());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("M1"), "stdout: {stdout}");
    assert!(stdout.contains("day1  1:2 2:1"), "stdout: {stdout}");
    assert!(stdout.contains("day2  5:1"), "stdout: {stdout}");
}

#[test]
fn resolve_failed_subject_exits_1_and_keeps_others() {
    let file = write_study(STUDY);
    let out = run(&["resolve", "--no-color"], &file);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stdout.contains("M1"), "stdout: {stdout}");
    assert!(!stdout.contains("M2"), "stdout: {stdout}");
    assert!(stderr.contains("[E] M2"), "stderr: {stderr}");
    assert!(
        stderr.contains("1 of 2 subject(s) could not be resolved"),
        "stderr: {stderr}"
    );
}

#[test]
fn resolve_json_lists_every_subject() {
    let file = write_study(STUDY);
    let out = run(&["resolve", "--format", "json"], &file);
    assert_eq!(out.status.code(), Some(1));
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("JSON stdout");
    let subjects = value["subjects"].as_array().expect("subjects array");
    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[0]["status"], "resolved");
    assert_eq!(subjects[1]["status"], "failed");

    let day1 = &subjects[0]["sessions"][0];
    assert_eq!(day1["session"], "day1");
    assert_eq!(day1["table"]["1"], 1);
    assert_eq!(day1["table"]["2"], 2);
    assert_eq!(day1["table"]["3"], 3);
    let day2 = &subjects[0]["sessions"][1];
    assert_eq!(day2["table"]["4"], 1);
    assert_eq!(day2["table"]["1"], 4);
}

#[test]
fn resolve_json_keeps_stderr_ndjson() {
    let file = write_study(STUDY);
    let out = Command::new(unitmatch_bin())
        .args(["resolve", "--format", "json"])
        .arg(file.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("run unitmatch");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let lines: Vec<&str> = stderr.lines().collect();
    let (last, problems) = lines.split_last().expect("stderr output");
    assert!(last.starts_with("error:"), "stderr: {stderr}");
    assert_eq!(problems.len(), 1, "one problem per failure: {stderr}");
    for line in problems {
        let problem: serde_json::Value =
            serde_json::from_str(line).expect("problem line is NDJSON");
        assert_eq!(problem["severity"], "error");
        assert_eq!(problem["subject"], "M2");
    }
}

#[test]
fn resolve_human_failure_has_no_ansi_with_no_color() {
    let file = write_study(STUDY);
    let out = Command::new(unitmatch_bin())
        .args(["resolve", "--no-color"])
        .arg(file.path())
        .env_remove("RUST_LOG")
        .output()
        .expect("run unitmatch");
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(!stderr.contains('\x1b'), "stderr: {stderr}");
    assert_eq!(
        stderr.matches("M2").count(),
        1,
        "failure reported once: {stderr}"
    );
}

#[test]
fn resolve_legacy_numbering_changes_unmatched_ids() {
    let file = write_study(STUDY);
    let out = run(&["resolve", "--legacy", "--format", "json"], &file);
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).expect("JSON stdout");
    let day1 = &value["subjects"][0]["sessions"][0]["table"];
    let day2 = &value["subjects"][0]["sessions"][1]["table"];
    assert_eq!(day1["1"], 1);
    assert_ne!(day2["1"], 4, "legacy numbering should differ: {value}");
}

#[test]
fn resolve_reads_stdin() {
    let mut child = Command::new(unitmatch_bin())
        .args(["resolve", "-"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn unitmatch");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(CLEAN.as_bytes())
        .expect("write stdin");
    let out = child.wait_with_output().expect("wait");
    assert!(out.status.success(), "exit code: {:?}", out.status.code());
    assert!(String::from_utf8_lossy(&out.stdout).contains("day2  5:1"));
}

#[test]
fn resolve_missing_file_exits_2() {
    let out = Command::new(unitmatch_bin())
        .args(["resolve", "/nonexistent/study.json"])
        .output()
        .expect("run unitmatch");
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("file not found"), "stderr: {stderr}");
}

#[test]
fn resolve_malformed_json_exits_2() {
    let file = write_study("{\"subjects\": [");
    let out = run(&["resolve"], &file);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid study document"), "stderr: {stderr}");
}

#[test]
fn resolve_file_too_large_exits_2() {
    let file = write_study(CLEAN);
    let out = run(&["resolve", "--max-file-size", "16"], &file);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("file too large"), "stderr: {stderr}");
}

#[test]
fn version_prints_crate_version() {
    let out = Command::new(unitmatch_bin())
        .arg("version")
        .output()
        .expect("run unitmatch");
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")), "stdout: {stdout}");
}
