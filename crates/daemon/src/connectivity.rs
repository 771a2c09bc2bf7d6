// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity monitor.
//!
//! A periodic, duplicate-suppressed task decides ethernet-versus-wireless
//! upstream: wired WAN always wins; otherwise the monitor rescans, keeps a
//! healthy association, or associates with the first stored candidate.
//! Connectivity levels derive from a gateway ARP probe (Local) and the
//! configured reachability scripts (Internet).

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nak_core::netstate::InterfaceRole;
use nak_core::{ConnectivityLevel, Event};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::adapters::{any_executable_succeeds, Shell};
use crate::event_bus::EventBus;
use crate::module::{Module, ModuleError};
use crate::netintf::Netintf;
use crate::rpc::message;
use crate::rpc::{Access, Command, CommandRegistry};
use crate::timer::{TimerHandle, TimerService};
use crate::wlan::WlanManager;
use crate::workqueue::{Work, Workqueue};

pub const UPDATE_INTERVAL: std::time::Duration = std::time::Duration::from_secs(10);
const UPDATE_TASK: &str = "connectivity update";

pub struct ConnectivityMonitor {
    netintf: Arc<Netintf>,
    wlan: Arc<WlanManager>,
    events: Arc<EventBus>,
    shell: Arc<dyn Shell>,
    script_dir: PathBuf,
    // one update cycle at a time
    update_lock: tokio::sync::Mutex<()>,
}

impl ConnectivityMonitor {
    pub fn new(
        netintf: Arc<Netintf>,
        wlan: Arc<WlanManager>,
        events: Arc<EventBus>,
        shell: Arc<dyn Shell>,
        script_dir: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            netintf,
            wlan,
            events,
            shell,
            script_dir,
            update_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Wired WAN carrier, `None` while network state is unknown.
    fn ethernet_wan_available(&self) -> Option<bool> {
        if !self.netintf.state_known() {
            return None;
        }
        Some(self.netintf.carrier(InterfaceRole::Wan) == Some(true))
    }

    async fn arping_gateway(&self) -> bool {
        let script = self.script_dir.join("util").join("arping_gateway.sh");
        let interface = self.wlan.interface_name();
        match self.shell.exec(&script, &[&interface]).await {
            Ok(out) => out.success(),
            Err(e) => {
                warn!("gateway ARP probe failed to run: {e}");
                false
            }
        }
    }

    async fn gateway_ip(&self) -> Option<String> {
        let script = self.script_dir.join("util").join("gateway_ip.sh");
        match self.shell.exec(&script, &[]).await {
            Ok(out) if out.success() => Some(out.output.trim().to_string()),
            _ => None,
        }
    }

    /// Cheap online query: wired WAN carrier, else responsive gateway over
    /// an enabled WLAN.
    pub async fn online(&self) -> bool {
        if self.ethernet_wan_available() == Some(true) {
            return true;
        }
        if self.wlan.disabled() == Some(false) {
            return self.arping_gateway().await;
        }
        false
    }

    pub async fn local_connectivity(&self) -> bool {
        self.arping_gateway().await
    }

    /// At least one reachability script exiting 0 means the internet is
    /// reachable; the gateway probe must pass first.
    pub async fn internet_connectivity(&self) -> bool {
        if !self.local_connectivity().await {
            return false;
        }
        let dir = self.script_dir.join("connectivity").join("internet");
        any_executable_succeeds(&*self.shell, &dir).await
    }

    pub async fn connectivity(&self) -> ConnectivityLevel {
        if self.internet_connectivity().await {
            return ConnectivityLevel::Internet;
        }
        if self.local_connectivity().await {
            return ConnectivityLevel::Local;
        }
        ConnectivityLevel::None
    }

    /// One monitor cycle. Never overlaps with itself.
    pub async fn update(&self) {
        let _cycle = self.update_lock.lock().await;

        // prefer ethernet
        let wan = match self.ethernet_wan_available() {
            None => {
                debug!("network state not yet known, skipping cycle");
                return;
            }
            Some(wan) => wan,
        };
        if wan {
            if self.wlan.disabled() == Some(false) {
                if let Err(e) = self.wlan.disconnect().await {
                    warn!("couldn't disable WLAN: {e}");
                }
            }
            return;
        }

        if let Err(e) = self.wlan.scan().await {
            warn!("wireless rescan failed: {e}");
        }
        debug!(count = self.wlan.netcount(), "wireless networks available");

        let wlan_disabled = match self.wlan.disabled() {
            None => {
                warn!("can't query WLAN interface configuration");
                return;
            }
            Some(disabled) => disabled,
        };

        if !wlan_disabled {
            // keep a healthy association
            let current = self.wlan.current();
            match current {
                Some(network) if self.wlan.in_range(&network.ssid) == Some(true) => {
                    let gateway = self.gateway_ip().await.unwrap_or_default();
                    debug!(
                        ssid = %network.ssid,
                        gateway = %gateway,
                        "association still in range, arp-pinging the default gateway"
                    );
                    if self.arping_gateway().await {
                        debug!("gateway responsive");
                        return;
                    }
                    info!("default gateway doesn't respond to ARP ping");
                    if let Err(e) = self.wlan.disconnect().await {
                        warn!("couldn't disconnect WLAN: {e}");
                    }
                }
                Some(network) => {
                    info!(ssid = %network.ssid, "WLAN is no longer in range");
                    if let Err(e) = self.wlan.disconnect().await {
                        warn!("couldn't disconnect WLAN: {e}");
                    }
                }
                None => {}
            }
        }

        info!("no ethernet or wireless connection, looking for WLAN candidate");
        let Some(candidate) = self.wlan.candidate() else {
            info!("no available wireless networks");
            if !wlan_disabled {
                self.events.push(Event::ConnectivityLost);
            }
            return;
        };

        info!(ssid = %candidate.ssid, "connecting to wireless network");
        match self.wlan.connect(&candidate).await {
            Ok(()) => {
                info!(ssid = %candidate.ssid, "wireless connection configured");
                self.events.push(Event::ConnectivityOk);
            }
            Err(e) => warn!(ssid = %candidate.ssid, "wireless connection failed: {e}"),
        }
    }
}

/// Register the `connectivity` command.
pub fn register_commands(registry: &CommandRegistry, monitor: &Arc<ConnectivityMonitor>) {
    let monitor = Arc::clone(monitor);
    registry.register(Command {
        name: "connectivity",
        desc: "Connectivity status - local: gateway, internet: probabilistic, based on \
               a group of services that should be reachable anywhere in the world.",
        usage: r#"{"jsonrpc": "2.0", "method": "connectivity", "id": 42}"#,
        access: Access::User,
        module: "connectivity",
        handler: Arc::new(move |request| {
            let monitor = Arc::clone(&monitor);
            Box::pin(async move {
                let local = monitor.local_connectivity().await;
                let internet = monitor.internet_connectivity().await;
                message::response_result(
                    &request,
                    serde_json::json!({"local": local, "internet": internet}),
                )
            })
        }),
    });
}

/// Module glue: the periodic update task and the initial pessimistic push.
pub struct ConnectivityModule {
    monitor: Arc<ConnectivityMonitor>,
    events: Arc<EventBus>,
    timers: Arc<TimerService>,
    wq: Arc<Workqueue>,
    timer: Mutex<Option<TimerHandle>>,
}

impl ConnectivityModule {
    pub fn new(
        monitor: Arc<ConnectivityMonitor>,
        events: Arc<EventBus>,
        timers: Arc<TimerService>,
        wq: Arc<Workqueue>,
    ) -> Arc<Self> {
        Arc::new(Self { monitor, events, timers, wq, timer: Mutex::new(None) })
    }

    fn enqueue_update(monitor: &Arc<ConnectivityMonitor>, wq: &Arc<Workqueue>) {
        if wq.pending(UPDATE_TASK) {
            return;
        }
        let monitor = Arc::clone(monitor);
        wq.add(Work::new(UPDATE_TASK, async move {
            monitor.update().await;
        }));
    }
}

#[async_trait]
impl Module for ConnectivityModule {
    fn name(&self) -> &'static str {
        "connectivity"
    }

    fn deps(&self) -> &'static [&'static str] {
        &["workqueue", "event", "timer", "netintf", "wlan", "notification"]
    }

    async fn init(&self) -> Result<(), ModuleError> {
        // assume the worst until the first cycle proves otherwise
        self.events.push(Event::ConnectivityLost);
        Self::enqueue_update(&self.monitor, &self.wq);

        let monitor = Arc::clone(&self.monitor);
        let wq = Arc::clone(&self.wq);
        let handle = self.timers.add("connectivity update", UPDATE_INTERVAL, move || {
            Self::enqueue_update(&monitor, &wq);
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
#[path = "connectivity_tests.rs"]
mod tests;
