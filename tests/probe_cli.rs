mod common;

use common::{hostprep, run, stderr, stdout, Workspace};
use serde_json::Value;

#[test]
fn check_reports_satisfied_and_outdated_tools() {
    let ws = Workspace::new();
    ws.fake_tool("fakenode", "v20.11.1");

    let output = run(hostprep(ws.dir.path())
        .args(["check", "--tool", "fakenode", "--min-major", "18"])
        .env("PATH", ws.search_path()));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output).trim(),
        "fakenode 20.11.1 already satisfies fakenode >= 18"
    );

    let output = run(hostprep(ws.dir.path())
        .args(["check", "--tool", "fakenode", "--min-major", "22", "--json"])
        .env("PATH", ws.search_path()));
    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_str(&stdout(&output)).expect("report JSON");
    assert_eq!(report["satisfied"], false);
    assert_eq!(report["found"], "20.11.1");
}

#[test]
fn check_treats_missing_tool_as_unsatisfied() {
    let ws = Workspace::new();
    let output = run(hostprep(ws.dir.path()).args([
        "check",
        "--tool",
        "hostprep-no-such-tool",
        "--min-major",
        "1",
    ]));
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("is not installed"));
}

#[test]
fn explicit_subnet_is_printed_verbatim() {
    let ws = Workspace::new();
    let output = run(hostprep(ws.dir.path()).args([
        "subnet",
        "--non-interactive",
        "--subnet",
        "192.168.1.0/24",
    ]));
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "192.168.1.0/24");
}

#[test]
fn malformed_subnet_names_the_expected_pattern() {
    let ws = Workspace::new();
    let output = run(hostprep(ws.dir.path()).args([
        "subnet",
        "--non-interactive",
        "--subnet",
        "999.1.1.1/24",
    ]));
    assert!(!output.status.success());
    assert!(stderr(&output).contains("A.B.C.D/N"));
}

#[test]
fn broad_subnet_is_declined_non_interactively() {
    let ws = Workspace::new();
    let output = run(hostprep(ws.dir.path()).args([
        "subnet",
        "--non-interactive",
        "--subnet",
        "10.0.0.0/8",
    ]));
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("declined"));
}

#[test]
fn fetch_run_rejects_empty_preview() {
    let ws = Workspace::new();
    let output = run(hostprep(ws.dir.path()).args([
        "fetch-run",
        "--url",
        "https://example.invalid/install.sh",
        "--preview-lines",
        "0",
    ]));
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("--preview-lines"));
}
