// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VPN daemon control seam: start/stop/restart/state.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VpnError {
    #[error("Can't access VPN configuration at {0}")]
    ConfigMissing(PathBuf),

    #[error("Management socket error: {0}")]
    Management(String),

    #[error("Couldn't start VPN daemon: {0}")]
    Spawn(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One `time,state` line from the management `state` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpnStateLine {
    pub timestamp: String,
    pub state: String,
}

#[async_trait]
pub trait VpnControl: Send + Sync {
    async fn start(&self) -> Result<(), VpnError>;
    async fn stop(&self) -> Result<(), VpnError>;
    async fn restart(&self) -> Result<(), VpnError>;
    async fn state(&self) -> Result<Vec<VpnStateLine>, VpnError>;
}

/// Recording control surface for tests.
#[derive(Default)]
pub struct FakeVpn {
    pub calls: Mutex<Vec<&'static str>>,
    fail_start: Mutex<bool>,
    running: Mutex<bool>,
}

impl FakeVpn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_start(&self, fail: bool) {
        *self.fail_start.lock() = fail;
    }

    pub fn is_running(&self) -> bool {
        *self.running.lock()
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == name).count()
    }
}

#[async_trait]
impl VpnControl for FakeVpn {
    async fn start(&self) -> Result<(), VpnError> {
        self.calls.lock().push("start");
        if *self.fail_start.lock() {
            return Err(VpnError::Management("scripted failure".into()));
        }
        *self.running.lock() = true;
        Ok(())
    }

    async fn stop(&self) -> Result<(), VpnError> {
        self.calls.lock().push("stop");
        *self.running.lock() = false;
        Ok(())
    }

    async fn restart(&self) -> Result<(), VpnError> {
        self.calls.lock().push("restart");
        Ok(())
    }

    async fn state(&self) -> Result<Vec<VpnStateLine>, VpnError> {
        self.calls.lock().push("state");
        Ok(vec![VpnStateLine {
            timestamp: "1451602800".into(),
            state: if self.is_running() { "CONNECTED" } else { "EXITING" }.into(),
        }])
    }
}
