// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LED sink seam: `"1\n"` / `"0\n"` writes to a hardware path.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use super::ConfigStore;

pub trait LedSink: Send + Sync {
    /// Drive the sink behind `key` to the given level. Best-effort: an
    /// unresolvable or unwritable sink must not take the mixer down.
    fn set(&self, key: &str, level: bool);
}

/// Production sink: resolves `nakd.leds.<key>` to a character-device path.
pub struct FsLedSink {
    config: Arc<dyn ConfigStore>,
}

impl FsLedSink {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self { config }
    }
}

impl LedSink for FsLedSink {
    fn set(&self, key: &str, level: bool) {
        let Some(path) = self.config.option_str("nakd", "leds", key) else {
            warn!(key, "couldn't retrieve LED path from configuration");
            return;
        };
        let value = if level { "1\n" } else { "0\n" };
        if let Err(e) = std::fs::write(&path, value) {
            warn!(key, path, "couldn't write LED sink: {e}");
        }
    }
}

/// Recording sink for tests.
#[derive(Default)]
pub struct FakeLedSink {
    pub writes: Mutex<Vec<(String, bool)>>,
}

impl FakeLedSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to `key`, if any.
    pub fn last_level(&self, key: &str) -> Option<bool> {
        self.writes.lock().iter().rev().find(|(k, _)| k == key).map(|(_, level)| *level)
    }
}

impl LedSink for FakeLedSink {
    fn set(&self, key: &str, level: bool) {
        self.writes.lock().push((key.to_string(), level));
    }
}
