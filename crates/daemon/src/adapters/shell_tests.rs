// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use tempfile::tempdir;

fn write_script(dir: &Path, name: &str, body: &str, executable: bool) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "#!/bin/sh").unwrap();
    writeln!(f, "{body}").unwrap();
    drop(f);
    let mode = if executable { 0o755 } else { 0o644 };
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
    path
}

#[tokio::test]
async fn system_shell_captures_output_and_status() {
    let temp = tempdir().unwrap();
    let script = write_script(temp.path(), "hello.sh", "echo hello; exit 3", true);

    let out = SystemShell.exec(&script, &[]).await.unwrap();
    assert_eq!(out.status, 3);
    assert!(out.output.contains("hello"));
    assert!(!out.success());
}

#[tokio::test]
async fn run_executables_skips_non_executable_files() {
    let temp = tempdir().unwrap();
    let marker = temp.path().join("ran");
    write_script(
        temp.path(),
        "10-touch.sh",
        &format!("touch {}", marker.display()),
        true,
    );
    write_script(temp.path(), "20-skipped.sh", "exit 1", false);

    run_executables(&SystemShell, temp.path()).await.unwrap();
    assert!(marker.exists());
}

#[tokio::test]
async fn run_executables_aborts_on_first_failure() {
    let temp = tempdir().unwrap();
    let marker = temp.path().join("late");
    write_script(temp.path(), "10-fail.sh", "exit 1", true);
    write_script(
        temp.path(),
        "20-late.sh",
        &format!("touch {}", marker.display()),
        true,
    );

    assert!(run_executables(&SystemShell, temp.path()).await.is_err());
    assert!(!marker.exists());
}

#[tokio::test]
async fn run_executables_tolerates_missing_dir() {
    let temp = tempdir().unwrap();
    run_executables(&SystemShell, &temp.path().join("nope")).await.unwrap();
}

#[tokio::test]
async fn any_executable_succeeds_short_circuits() {
    let temp = tempdir().unwrap();
    write_script(temp.path(), "10-fail.sh", "exit 1", true);
    write_script(temp.path(), "20-ok.sh", "exit 0", true);
    assert!(any_executable_succeeds(&SystemShell, temp.path()).await);

    let empty = tempdir().unwrap();
    assert!(!any_executable_succeeds(&SystemShell, empty.path()).await);
}

#[tokio::test]
async fn fake_shell_replays_scripted_responses() {
    let shell = FakeShell::new();
    shell.respond("arping_gateway.sh", 1, "");

    let out = shell.exec(Path::new("/scripts/util/arping_gateway.sh"), &["wlan0"]).await.unwrap();
    assert_eq!(out.status, 1);

    let out = shell.exec(Path::new("/scripts/unknown.sh"), &[]).await.unwrap();
    assert!(out.success());

    assert_eq!(shell.calls_for("arping_gateway.sh"), 1);
    assert_eq!(shell.calls.lock().len(), 2);
}
