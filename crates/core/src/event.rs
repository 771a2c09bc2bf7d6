// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for the nakd daemon
//!
//! Events form a closed set: they describe carrier edges on the wired
//! interfaces, wireless availability, and upstream connectivity changes.
//! Handlers subscribe through the event bus and run on workqueue workers.

use serde::{Deserialize, Serialize};

/// Discrete events dispatched through the event bus.
///
/// Serializes with `{"type": "scope:name"}` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "eth:wan_plugged")]
    EthWanPlugged,

    #[serde(rename = "eth:wan_lost")]
    EthWanLost,

    #[serde(rename = "eth:lan_plugged")]
    EthLanPlugged,

    #[serde(rename = "eth:lan_lost")]
    EthLanLost,

    #[serde(rename = "wireless:available")]
    WirelessAvailable,

    #[serde(rename = "wireless:lost")]
    WirelessLost,

    #[serde(rename = "connectivity:lost")]
    ConnectivityLost,

    #[serde(rename = "connectivity:ok")]
    ConnectivityOk,

    #[serde(rename = "network:traffic")]
    NetworkTraffic,
}

impl Event {
    /// Stable name, also used as the workqueue task name when dispatching
    /// handlers (duplicate suppression keys on it).
    pub fn name(&self) -> &'static str {
        match self {
            Event::EthWanPlugged => "eth:wan_plugged",
            Event::EthWanLost => "eth:wan_lost",
            Event::EthLanPlugged => "eth:lan_plugged",
            Event::EthLanLost => "eth:lan_lost",
            Event::WirelessAvailable => "wireless:available",
            Event::WirelessLost => "wireless:lost",
            Event::ConnectivityLost => "connectivity:lost",
            Event::ConnectivityOk => "connectivity:ok",
            Event::NetworkTraffic => "network:traffic",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
