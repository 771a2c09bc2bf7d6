// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network interface monitor.
//!
//! Polls the device-status provider, keeps the last two snapshots, and
//! pushes edge-triggered carrier events onto the event bus. Long-running
//! reconfiguration (the wireless reload) pauses updates so half-applied
//! state is never observed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nak_core::netstate::{carrier_edges, InterfaceRole, NetSnapshot};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::adapters::{ConfigStore, NetStatus};
use crate::event_bus::EventBus;
use crate::module::{Module, ModuleError};
use crate::rpc::message::{self, ErrorCode};
use crate::rpc::{Access, Command, CommandRegistry};
use crate::timer::{TimerHandle, TimerService};
use crate::workqueue::{Work, Workqueue};

pub const UPDATE_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);
const UPDATE_TASK: &str = "netintf update";

pub struct Netintf {
    provider: Arc<dyn NetStatus>,
    config: Arc<dyn ConfigStore>,
    events: Arc<EventBus>,
    snapshot: Mutex<NetSnapshot>,
    paused: AtomicBool,
}

impl Netintf {
    pub fn new(
        provider: Arc<dyn NetStatus>,
        config: Arc<dyn ConfigStore>,
        events: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            provider,
            config,
            events,
            snapshot: Mutex::new(NetSnapshot::default()),
            paused: AtomicBool::new(false),
        })
    }

    /// Concrete interface name bound to a role, from the configuration
    /// store.
    pub fn interface_name(&self, role: InterfaceRole) -> Option<String> {
        self.config.option_str("nakd", "interfaces", role.config_option())
    }

    /// Carrier bit for a role. `None` while the state is unknown or the
    /// role unbound.
    pub fn carrier(&self, role: InterfaceRole) -> Option<bool> {
        let name = self.interface_name(role)?;
        self.snapshot.lock().carrier(&name)
    }

    /// Latest provider object for a role, for the `interfaces` command.
    pub fn status_of(&self, role: InterfaceRole) -> Value {
        let Some(name) = self.interface_name(role) else {
            return Value::Null;
        };
        self.snapshot.lock().interface(&name).cloned().unwrap_or(Value::Null)
    }

    pub fn state_known(&self) -> bool {
        self.snapshot.lock().last.is_some()
    }

    /// Suspend polling across a reconfiguration window.
    pub fn pause_updates(&self) {
        debug!("pausing network state updates");
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume_updates(&self) {
        debug!("resuming network state updates");
        self.paused.store(false, Ordering::SeqCst);
    }

    /// One poll cycle: fetch the provider state, shift snapshots, emit
    /// carrier edges.
    pub async fn poll(&self) {
        if self.paused.load(Ordering::SeqCst) {
            return;
        }
        let state = match self.provider.device_status().await {
            Ok(state) => state,
            Err(e) => {
                debug!("device status unavailable: {e}");
                return;
            }
        };

        let roles: Vec<(InterfaceRole, String)> = InterfaceRole::ALL
            .iter()
            .filter_map(|role| self.interface_name(*role).map(|name| (*role, name)))
            .collect();
        if roles.is_empty() {
            warn!("no interface roles configured under nakd.interfaces");
        }

        let edges = {
            let mut snapshot = self.snapshot.lock();
            snapshot.push(state);
            match (&snapshot.previous, &snapshot.last) {
                (Some(previous), Some(last)) => carrier_edges(previous, last, &roles),
                _ => Vec::new(),
            }
        };
        for event in edges {
            self.events.push(event);
        }
    }
}

/// Register the `interfaces` command.
pub fn register_commands(registry: &CommandRegistry, netintf: &Arc<Netintf>) {
    let netintf = Arc::clone(netintf);
    registry.register(Command {
        name: "interfaces",
        desc: "Per-role interface status as reported by the device-status provider.",
        usage: r#"{"jsonrpc": "2.0", "method": "interfaces", "id": 42}"#,
        access: Access::User,
        module: "netintf",
        handler: Arc::new(move |request| {
            let netintf = Arc::clone(&netintf);
            Box::pin(async move {
                if !netintf.state_known() {
                    return Some(message::response_error(
                        Some(&request),
                        ErrorCode::InternalError,
                        Some("Network state not yet known - please try again later"),
                    ));
                }
                let result = json!({
                    "LAN": netintf.status_of(InterfaceRole::Lan),
                    "WAN": netintf.status_of(InterfaceRole::Wan),
                    "WLAN": netintf.status_of(InterfaceRole::Wlan),
                    "AP": netintf.status_of(InterfaceRole::Ap),
                });
                message::response_result(&request, result)
            })
        }),
    });
}

/// Module glue: the poll timer, coalesced through the workqueue.
pub struct NetintfModule {
    netintf: Arc<Netintf>,
    timers: Arc<TimerService>,
    wq: Arc<Workqueue>,
    timer: Mutex<Option<TimerHandle>>,
}

impl NetintfModule {
    pub fn new(
        netintf: Arc<Netintf>,
        timers: Arc<TimerService>,
        wq: Arc<Workqueue>,
    ) -> Arc<Self> {
        Arc::new(Self { netintf, timers, wq, timer: Mutex::new(None) })
    }
}

#[async_trait]
impl Module for NetintfModule {
    fn name(&self) -> &'static str {
        "netintf"
    }

    fn deps(&self) -> &'static [&'static str] {
        &["timer", "workqueue", "event"]
    }

    async fn init(&self) -> Result<(), ModuleError> {
        let netintf = Arc::clone(&self.netintf);
        let wq = Arc::clone(&self.wq);
        let handle = self.timers.add("netintf update", UPDATE_INTERVAL, move || {
            if wq.pending(UPDATE_TASK) {
                return;
            }
            let netintf = Arc::clone(&netintf);
            wq.add(Work::new(UPDATE_TASK, async move {
                netintf.poll().await;
            }));
        });
        *self.timer.lock() = Some(handle);
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        if let Some(handle) = self.timer.lock().take() {
            self.timers.remove(handle);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "netintf_tests.rs"]
mod tests;
