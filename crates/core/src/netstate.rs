// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network interface state snapshots and carrier-edge detection.
//!
//! The device-status provider returns a JSON object keyed by interface name,
//! each entry carrying a boolean `carrier`. Edges are derived only from two
//! adjacent snapshots, so transient same-poll flaps collapse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Event;

/// Interface roles the daemon cares about. Roles are resolved to concrete
/// interface names through the configuration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterfaceRole {
    Lan,
    Wan,
    Wlan,
    Ap,
}

impl InterfaceRole {
    pub const ALL: [InterfaceRole; 4] =
        [InterfaceRole::Lan, InterfaceRole::Wan, InterfaceRole::Wlan, InterfaceRole::Ap];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceRole::Lan => "LAN",
            InterfaceRole::Wan => "WAN",
            InterfaceRole::Wlan => "WLAN",
            InterfaceRole::Ap => "AP",
        }
    }

    /// Option name under the `nakd.interfaces` config section.
    pub fn config_option(&self) -> &'static str {
        match self {
            InterfaceRole::Lan => "lan",
            InterfaceRole::Wan => "wan",
            InterfaceRole::Wlan => "wlan",
            InterfaceRole::Ap => "ap",
        }
    }
}

impl std::fmt::Display for InterfaceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last two replies from the device-status provider.
#[derive(Debug, Clone, Default)]
pub struct NetSnapshot {
    pub previous: Option<Value>,
    pub last: Option<Value>,
}

impl NetSnapshot {
    /// Shift in a fresh provider reply, retiring the previous one.
    pub fn push(&mut self, state: Value) {
        self.previous = self.last.take();
        self.last = Some(state);
    }

    /// Status object for a concrete interface name, if known.
    pub fn interface(&self, name: &str) -> Option<&Value> {
        self.last.as_ref().and_then(|state| state.get(name))
    }

    /// Carrier bit for a concrete interface name. `None` when the interface
    /// is absent from the last snapshot or carries no boolean.
    pub fn carrier(&self, name: &str) -> Option<bool> {
        carrier_of(self.last.as_ref()?, name)
    }
}

fn carrier_of(state: &Value, name: &str) -> Option<bool> {
    state.get(name)?.get("carrier")?.as_bool()
}

/// Derive edge-triggered events between two adjacent snapshots.
///
/// An event fires iff the previous snapshot reported `carrier = false` and
/// the current one reports `carrier = true` for the interface bound to a
/// role (and symmetrically for the falling edge). Interfaces missing from
/// either snapshot produce no edge.
pub fn carrier_edges(
    previous: &Value,
    last: &Value,
    roles: &[(InterfaceRole, String)],
) -> Vec<Event> {
    let mut events = Vec::new();
    for (role, iface) in roles {
        let (Some(was), Some(now)) = (carrier_of(previous, iface), carrier_of(last, iface)) else {
            continue;
        };
        if was == now {
            continue;
        }
        let event = match (role, now) {
            (InterfaceRole::Wan, true) => Event::EthWanPlugged,
            (InterfaceRole::Wan, false) => Event::EthWanLost,
            (InterfaceRole::Lan, true) => Event::EthLanPlugged,
            (InterfaceRole::Lan, false) => Event::EthLanLost,
            (InterfaceRole::Wlan, true) => Event::WirelessAvailable,
            (InterfaceRole::Wlan, false) => Event::WirelessLost,
            // AP carrier changes have no subscriber-visible event
            (InterfaceRole::Ap, _) => continue,
        };
        events.push(event);
    }
    events
}

#[cfg(test)]
#[path = "netstate_tests.rs"]
mod tests;
