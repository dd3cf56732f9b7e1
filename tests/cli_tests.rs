//! Process-level behavior of the jobhost binary: exit codes for foreground
//! success, command failure, bad arguments, and missing configuration.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_jobhost<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_jobhost"))
        .args(args)
        .output()
        .expect("failed to spawn jobhost")
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("jobhost.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn foreground_success_exits_zero() {
    let dir = TempDir::new().unwrap();
    let beat = dir.path().join("beat.log");
    let config = write_config(
        dir.path(),
        &format!("heartbeat:\n  file: {}\n", beat.display()),
    );

    let output = run_jobhost([
        "--process",
        "heartbeat",
        "--file",
        config.to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(beat.exists(), "heartbeat file was not written");
}

#[test]
fn failed_command_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "cleanup:\n  dir: {}\n",
            dir.path().join("missing").display()
        ),
    );

    let output = run_jobhost(["--process", "cleanup", "--file", config.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {}", stderr);
}

#[test]
fn missing_config_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("jobhost.yaml");

    let output = run_jobhost(["--process", "report", "--file", absent.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn unrecognized_operation_exits_nonzero() {
    let output = run_jobhost(["--process", "shred"]);
    assert!(!output.status.success());
}

#[test]
fn missing_required_argument_exits_nonzero() {
    let output = run_jobhost(["--supervised"]);
    assert!(!output.status.success());
}
