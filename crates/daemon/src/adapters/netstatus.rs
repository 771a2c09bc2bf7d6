// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device-status provider seam.
//!
//! On request, returns a JSON object keyed by interface name, each entry
//! carrying at least a boolean `carrier`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;

use super::{Shell, ShellError};

#[derive(Debug, Error)]
pub enum NetStatusError {
    #[error("Shell error: {0}")]
    Shell(#[from] ShellError),

    #[error("Unusual device status reply: {0}")]
    BadReply(String),

    #[error("Network state not yet known")]
    Unknown,
}

#[async_trait]
pub trait NetStatus: Send + Sync {
    async fn device_status(&self) -> Result<Value, NetStatusError>;
}

/// Production provider: `ubus call network.device status`.
pub struct UbusNetStatus {
    shell: Arc<dyn Shell>,
    ubus: PathBuf,
}

impl UbusNetStatus {
    pub fn new(shell: Arc<dyn Shell>) -> Self {
        Self { shell, ubus: PathBuf::from("/bin/ubus") }
    }
}

#[async_trait]
impl NetStatus for UbusNetStatus {
    async fn device_status(&self) -> Result<Value, NetStatusError> {
        let out = self.shell.exec(&self.ubus, &["call", "network.device", "status"]).await?;
        if !out.success() {
            return Err(NetStatusError::BadReply(out.output));
        }
        let state: Value = serde_json::from_str(&out.output)
            .map_err(|e| NetStatusError::BadReply(e.to_string()))?;
        if !state.is_object() {
            return Err(NetStatusError::BadReply(out.output));
        }
        Ok(state)
    }
}

/// Settable provider for tests.
#[derive(Default)]
pub struct FakeNetStatus {
    state: Mutex<Option<Value>>,
}

impl FakeNetStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, state: Value) {
        *self.state.lock() = Some(state);
    }

    pub fn clear(&self) {
        *self.state.lock() = None;
    }
}

#[async_trait]
impl NetStatus for FakeNetStatus {
    async fn device_status(&self) -> Result<Value, NetStatusError> {
        self.state.lock().clone().ok_or(NetStatusError::Unknown)
    }
}
