// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell executor seam: spawn a child, capture its output, report status.

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exit status plus captured stdout/stderr of a finished child.
#[derive(Debug, Clone)]
pub struct ShellOutput {
    pub status: i32,
    pub output: String,
}

impl ShellOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { status: 0, output: output.into() }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }
}

#[async_trait]
pub trait Shell: Send + Sync {
    /// Run `program` with `args`, waiting for it to finish.
    async fn exec(&self, program: &Path, args: &[&str]) -> Result<ShellOutput, ShellError>;
}

/// Production executor backed by `tokio::process`.
#[derive(Default)]
pub struct SystemShell;

#[async_trait]
impl Shell for SystemShell {
    async fn exec(&self, program: &Path, args: &[&str]) -> Result<ShellOutput, ShellError> {
        debug!(program = %program.display(), ?args, "exec");
        let out = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        // terminated-by-signal children report no code
        let status = out.status.code().unwrap_or(-1);
        Ok(ShellOutput { status, output })
    }
}

/// Executable files in `dir`, sorted by name.
fn executables_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && std::fs::metadata(path)
                    .map(|m| m.permissions().mode() & 0o111 != 0)
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    paths
}

/// Run every executable file in `dir` in name order; the first non-zero
/// exit aborts. A missing or empty directory is not an error.
pub async fn run_executables(shell: &dyn Shell, dir: &Path) -> Result<(), ShellError> {
    for script in executables_in(dir) {
        let out = shell.exec(&script, &[]).await?;
        if !out.success() {
            return Err(ShellError::Io(std::io::Error::other(format!(
                "{} exited with status {}",
                script.display(),
                out.status
            ))));
        }
        debug!(script = %script.display(), "script output: {}", out.output.trim_end());
    }
    Ok(())
}

/// True when at least one executable in `dir` exits 0.
pub async fn any_executable_succeeds(shell: &dyn Shell, dir: &Path) -> bool {
    for script in executables_in(dir) {
        match shell.exec(&script, &[]).await {
            Ok(out) if out.success() => return true,
            _ => continue,
        }
    }
    false
}

/// Scripted executor for tests. Responses are keyed by the program's file
/// name; unknown programs succeed with empty output.
#[derive(Default)]
pub struct FakeShell {
    responses: Mutex<HashMap<String, ShellOutput>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for a program file name.
    pub fn respond(&self, name: &str, status: i32, output: &str) {
        self.responses
            .lock()
            .insert(name.to_string(), ShellOutput { status, output: output.to_string() });
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.contains(name)).count()
    }
}

#[async_trait]
impl Shell for FakeShell {
    async fn exec(&self, program: &Path, args: &[&str]) -> Result<ShellOutput, ShellError> {
        let mut call = program.display().to_string();
        for arg in args {
            call.push(' ');
            call.push_str(arg);
        }
        self.calls.lock().push(call);

        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let scripted = self.responses.lock().get(&name).cloned();
        Ok(scripted.unwrap_or_else(|| ShellOutput::ok("")))
    }
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
