// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wireless network entries and candidate selection.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One network observed by the hardware scanner. Scanners report at least
/// the SSID; anything else they include is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub ssid: String,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ScanEntry {
    pub fn new(ssid: impl Into<String>) -> Self {
        Self { ssid: ssid.into(), extra: Map::new() }
    }
}

/// Persisted credentials for a known network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNetwork {
    pub ssid: String,
    pub key: String,
}

impl StoredNetwork {
    pub fn new(ssid: impl Into<String>, key: impl Into<String>) -> Self {
        Self { ssid: ssid.into(), key: key.into() }
    }
}

/// Pick the connection candidate: the first scanned SSID that also appears
/// in the stored credentials, in scan order.
pub fn select_candidate<'a>(
    scanned: &[ScanEntry],
    stored: &'a [StoredNetwork],
) -> Option<&'a StoredNetwork> {
    scanned
        .iter()
        .find_map(|entry| stored.iter().find(|known| known.ssid == entry.ssid))
}

#[cfg(test)]
#[path = "wireless_tests.rs"]
mod tests;
