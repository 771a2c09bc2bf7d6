// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wireless scanner seam. The hardware side is device-dependent; the
//! production adapter shells out to a scan helper that prints a JSON array
//! of `{"ssid": ...}` objects.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nak_core::wireless::ScanEntry;
use parking_lot::Mutex;
use thiserror::Error;

use super::{Shell, ShellError};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Shell error: {0}")]
    Shell(#[from] ShellError),

    #[error("Scanning not possible: {0}")]
    Failed(String),
}

#[async_trait]
pub trait WlanScanner: Send + Sync {
    async fn scan(&self, interface: &str) -> Result<Vec<ScanEntry>, ScanError>;
}

/// Production scanner: runs `wlan_scan.sh <interface>`.
pub struct ScriptScanner {
    shell: Arc<dyn Shell>,
    script: PathBuf,
}

impl ScriptScanner {
    pub fn new(shell: Arc<dyn Shell>, script_dir: &std::path::Path) -> Self {
        Self { shell, script: script_dir.join("wlan_scan.sh") }
    }
}

#[async_trait]
impl WlanScanner for ScriptScanner {
    async fn scan(&self, interface: &str) -> Result<Vec<ScanEntry>, ScanError> {
        let out = self.shell.exec(&self.script, &[interface]).await?;
        if !out.success() {
            return Err(ScanError::Failed(format!("scan helper exited {}", out.status)));
        }
        serde_json::from_str(&out.output).map_err(|e| ScanError::Failed(e.to_string()))
    }
}

/// Scripted scanner for tests.
#[derive(Default)]
pub struct FakeScanner {
    networks: Mutex<Vec<ScanEntry>>,
    fail: Mutex<bool>,
}

impl FakeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_networks(&self, ssids: &[&str]) {
        *self.networks.lock() = ssids.iter().map(|s| ScanEntry::new(*s)).collect();
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }
}

#[async_trait]
impl WlanScanner for FakeScanner {
    async fn scan(&self, _interface: &str) -> Result<Vec<ScanEntry>, ScanError> {
        if *self.fail.lock() {
            return Err(ScanError::Failed("scan failed".into()));
        }
        Ok(self.networks.lock().clone())
    }
}
