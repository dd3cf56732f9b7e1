use super::*;
use crate::config::{CleanupSettings, HeartbeatSettings, ReportSettings};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn touch(dir: &Path, name: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"x").unwrap();
    path
}

#[test]
fn registry_resolves_every_operation() {
    let registry = CommandRegistry::new(&Settings::default());
    for operation in [Operation::Heartbeat, Operation::Cleanup, Operation::Report] {
        assert!(registry.resolve(operation).is_ok(), "{:?}", operation);
    }
}

#[test]
fn empty_registry_fails_with_unknown_operation() {
    let registry = CommandRegistry::empty();
    // Commands carry no Debug impl, so drop the Ok side before unwrapping
    let err = registry.resolve(Operation::Heartbeat).map(|_| ()).unwrap_err();
    assert!(matches!(err, HostError::UnknownOperation(ref name) if name == "heartbeat"));
}

#[test]
fn resolution_has_no_side_effects() {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.heartbeat = HeartbeatSettings {
        file: dir.path().join("beat.log"),
    };

    let registry = CommandRegistry::new(&settings);
    let _command = registry.resolve(Operation::Heartbeat).unwrap();
    assert!(!dir.path().join("beat.log").exists());
}

#[test]
fn heartbeat_appends_one_line_per_invocation() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("beat.log");
    let command = HeartbeatCommand::new(HeartbeatSettings { file: file.clone() });
    let cancel = CancelToken::new();

    command.execute(&cancel).unwrap();
    command.execute(&cancel).unwrap();

    let text = std::fs::read_to_string(&file).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("alive"));
}

#[test]
fn heartbeat_skips_write_when_already_cancelled() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("beat.log");
    let command = HeartbeatCommand::new(HeartbeatSettings { file: file.clone() });

    let cancel = CancelToken::new();
    cancel.cancel();
    command.execute(&cancel).unwrap();

    assert!(!file.exists());
}

#[test]
fn cleanup_removes_only_stale_files() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "old.tmp");
    std::fs::create_dir(dir.path().join("keepdir")).unwrap();

    // Everything written above is now older than a zero max_age
    std::thread::sleep(Duration::from_millis(50));

    let command = CleanupCommand::new(CleanupSettings {
        dir: dir.path().to_path_buf(),
        max_age: Duration::ZERO,
    });
    command.execute(&CancelToken::new()).unwrap();

    assert!(!dir.path().join("old.tmp").exists());
    assert!(dir.path().join("keepdir").exists());
}

#[test]
fn cleanup_keeps_files_younger_than_max_age() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "fresh.tmp");

    let command = CleanupCommand::new(CleanupSettings {
        dir: dir.path().to_path_buf(),
        max_age: Duration::from_secs(3600),
    });
    command.execute(&CancelToken::new()).unwrap();

    assert!(dir.path().join("fresh.tmp").exists());
}

#[test]
fn cleanup_missing_directory_is_a_command_failure() {
    let dir = TempDir::new().unwrap();
    let command = CleanupCommand::new(CleanupSettings {
        dir: dir.path().join("nope"),
        max_age: Duration::ZERO,
    });

    let err = command.execute(&CancelToken::new()).unwrap_err();
    assert!(matches!(err, HostError::PathNotFound(_)));
}

#[test]
fn report_leaves_the_directory_untouched() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "a.txt");
    touch(dir.path(), "b.txt");

    let command = ReportCommand::new(ReportSettings {
        dir: dir.path().to_path_buf(),
    });
    command.execute(&CancelToken::new()).unwrap();

    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.txt").exists());
}

#[test]
fn operation_names_are_stable() {
    assert_eq!(Operation::Heartbeat.as_str(), "heartbeat");
    assert_eq!(Operation::Cleanup.as_str(), "cleanup");
    assert_eq!(Operation::Report.as_str(), "report");
}

#[tokio::test]
async fn cancel_token_wakes_waiters() {
    let cancel = CancelToken::new();
    assert!(!cancel.is_cancelled());

    let waiter = cancel.clone();
    let handle = tokio::spawn(async move { waiter.cancelled().await });

    cancel.cancel();
    handle.await.unwrap();
    assert!(cancel.is_cancelled());

    // Resolves immediately once already cancelled
    cancel.cancelled().await;
}
