// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wireless manager: scan, candidate selection, association, and the
//! persisted SSID→key map.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nak_core::wireless::{select_candidate, ScanEntry, StoredNetwork};
use nak_core::Clock;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::adapters::{ConfigStore, Shell, WlanScanner};
use crate::module::{Module, ModuleError};
use crate::netintf::Netintf;
use crate::rpc::message::{self, ErrorCode};
use crate::rpc::{Access, Command, CommandRegistry};

const WLAN_DEFAULT_INTERFACE: &str = "wlan0";
const DEFAULT_ENCRYPTION: &str = "psk2";

/// Config section describing the client-side wireless interface.
const WIRELESS_PACKAGE: &str = "wireless";
const STA_SECTION: &str = "sta";

#[derive(Debug, Error)]
pub enum WlanError {
    #[error("Please scan before connecting")]
    ScanRequired,

    #[error("Network \"{0}\" is not in range")]
    NotInRange(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::adapters::ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] crate::adapters::ScanError),

    #[error("Couldn't reload wireless configuration: {0}")]
    Reload(String),

    #[error("Couldn't persist stored networks: {0}")]
    Persist(std::io::Error),
}

#[derive(Default)]
struct WlanState {
    networks: Vec<ScanEntry>,
    last_scan: Option<u64>,
    current: Option<StoredNetwork>,
    stored: Vec<StoredNetwork>,
}

pub struct WlanManager {
    scanner: Arc<dyn WlanScanner>,
    config: Arc<dyn ConfigStore>,
    shell: Arc<dyn Shell>,
    netintf: Arc<Netintf>,
    clock: Arc<dyn Clock>,
    networks_path: PathBuf,
    script_dir: PathBuf,
    state: Mutex<WlanState>,
    // serializes connect/disconnect/scan cycles across callers
    op_lock: tokio::sync::Mutex<()>,
}

impl WlanManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scanner: Arc<dyn WlanScanner>,
        config: Arc<dyn ConfigStore>,
        shell: Arc<dyn Shell>,
        netintf: Arc<Netintf>,
        clock: Arc<dyn Clock>,
        networks_path: PathBuf,
        script_dir: PathBuf,
    ) -> Arc<Self> {
        Arc::new(Self {
            scanner,
            config,
            shell,
            netintf,
            clock,
            networks_path,
            script_dir,
            state: Mutex::new(WlanState::default()),
            op_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn interface_name(&self) -> String {
        match self.netintf.interface_name(nak_core::netstate::InterfaceRole::Wlan) {
            Some(name) => name,
            None => {
                warn!(
                    "couldn't get WLAN interface name from configuration, \
                     continuing with default {WLAN_DEFAULT_INTERFACE}"
                );
                WLAN_DEFAULT_INTERFACE.to_string()
            }
        }
    }

    /// Whether the client interface is administratively disabled. `None`
    /// when the wireless configuration can't be queried.
    pub fn disabled(&self) -> Option<bool> {
        self.config.package(WIRELESS_PACKAGE)?.section(STA_SECTION)?;
        Some(
            self.config
                .option_str(WIRELESS_PACKAGE, STA_SECTION, "disabled")
                .is_some_and(|v| v == "1"),
        )
    }

    /// Rescan and atomically swap the cached list. An empty result is
    /// discarded, keeping the previous list.
    pub async fn scan(&self) -> Result<usize, WlanError> {
        info!("scanning for wireless networks");
        let interface = self.interface_name();
        let results = self.scanner.scan(&interface).await?;
        if results.is_empty() {
            info!("received an empty wireless network list, discarding");
            return Ok(self.netcount());
        }
        let count = results.len();
        let mut state = self.state.lock();
        state.networks = results;
        state.last_scan = Some(self.clock.epoch_secs());
        info!(count, "updated wireless network list");
        Ok(count)
    }

    pub fn netcount(&self) -> usize {
        self.state.lock().networks.len()
    }

    pub fn last_scan(&self) -> Option<u64> {
        self.state.lock().last_scan
    }

    /// `None` before the first successful scan.
    pub fn scan_results(&self) -> Option<Vec<ScanEntry>> {
        let state = self.state.lock();
        state.last_scan.map(|_| state.networks.clone())
    }

    pub fn stored_networks(&self) -> Vec<StoredNetwork> {
        self.state.lock().stored.clone()
    }

    pub fn current(&self) -> Option<StoredNetwork> {
        self.state.lock().current.clone()
    }

    /// In-range check against the cached scan. `None` before any scan.
    pub fn in_range(&self, ssid: &str) -> Option<bool> {
        let state = self.state.lock();
        state.last_scan?;
        Some(state.networks.iter().any(|n| n.ssid == ssid))
    }

    /// First scanned SSID with stored credentials.
    pub fn candidate(&self) -> Option<StoredNetwork> {
        let state = self.state.lock();
        select_candidate(&state.networks, &state.stored).cloned()
    }

    /// Load the persisted credentials file. Malformed content is a
    /// configuration error: logged, and the list starts empty.
    pub fn load_stored(&self) {
        let stored = match std::fs::read_to_string(&self.networks_path) {
            Ok(text) => match serde_json::from_str::<Vec<StoredNetwork>>(&text) {
                Ok(stored) => stored,
                Err(e) => {
                    error!(
                        path = %self.networks_path.display(),
                        "malformed stored networks file: {e}"
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                error!(path = %self.networks_path.display(), "couldn't read stored networks: {e}");
                Vec::new()
            }
        };
        info!(count = stored.len(), "read known networks");
        self.state.lock().stored = stored;
    }

    fn save_stored(&self, stored: &[StoredNetwork]) -> Result<(), WlanError> {
        let text = serde_json::to_string(stored).unwrap_or_else(|_| "[]".to_string());
        let tmp = self.networks_path.with_extension("tmp");
        std::fs::write(&tmp, text).map_err(WlanError::Persist)?;
        std::fs::rename(&tmp, &self.networks_path).map_err(WlanError::Persist)?;
        Ok(())
    }

    /// Remember credentials: any existing entry with the same SSID is
    /// replaced, and the file rewritten atomically.
    pub fn store(&self, network: StoredNetwork) -> Result<(), WlanError> {
        let mut state = self.state.lock();
        state.stored.retain(|n| n.ssid != network.ssid);
        state.stored.push(network);
        self.save_stored(&state.stored)
    }

    /// Drop stored credentials for an SSID. Returns whether anything was
    /// removed.
    pub fn forget(&self, ssid: &str) -> Result<bool, WlanError> {
        let mut state = self.state.lock();
        let before = state.stored.len();
        state.stored.retain(|n| n.ssid != ssid);
        if state.stored.len() == before {
            return Ok(false);
        }
        self.save_stored(&state.stored)?;
        Ok(true)
    }

    /// Associate with a network: rewrite the wireless section, then reload
    /// the wireless subsystem with state updates paused.
    pub async fn connect(&self, network: &StoredNetwork) -> Result<(), WlanError> {
        let _op = self.op_lock.lock().await;
        match self.in_range(&network.ssid) {
            None => return Err(WlanError::ScanRequired),
            Some(false) => return Err(WlanError::NotInRange(network.ssid.clone())),
            Some(true) => {}
        }

        info!(ssid = %network.ssid, "connecting to wireless network");
        self.config
            .set_option(WIRELESS_PACKAGE, STA_SECTION, "ssid", network.ssid.as_str().into())?;
        self.config
            .set_option(WIRELESS_PACKAGE, STA_SECTION, "key", network.key.as_str().into())?;
        self.config
            .set_option(WIRELESS_PACKAGE, STA_SECTION, "encryption", DEFAULT_ENCRYPTION.into())?;
        self.config.set_option(WIRELESS_PACKAGE, STA_SECTION, "disabled", "0".into())?;
        self.config.commit(WIRELESS_PACKAGE)?;

        self.state.lock().current = Some(network.clone());
        self.reload_wireless().await
    }

    /// Disable the client interface and reload.
    pub async fn disconnect(&self) -> Result<(), WlanError> {
        let _op = self.op_lock.lock().await;
        info!("disabling WLAN");
        self.config.set_option(WIRELESS_PACKAGE, STA_SECTION, "disabled", "1".into())?;
        self.config.commit(WIRELESS_PACKAGE)?;
        self.state.lock().current = None;
        self.reload_wireless().await
    }

    async fn reload_wireless(&self) -> Result<(), WlanError> {
        // avoid spurious carrier edges while the subsystem restarts
        self.netintf.pause_updates();
        info!("restarting WLAN");
        let script = self.script_dir.join("wlan_restart.sh");
        let result = self.shell.exec(&script, &[]).await;
        self.netintf.resume_updates();

        match result {
            Ok(out) if out.success() => {
                debug!("wireless reload output: {}", out.output.trim_end());
                Ok(())
            }
            Ok(out) => Err(WlanError::Reload(format!("reload script exited {}", out.status))),
            Err(e) => Err(WlanError::Reload(e.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct ConnectParams {
    ssid: String,
    key: String,
    #[serde(default)]
    store: bool,
}

/// Register the `wlan_*` commands.
pub fn register_commands(registry: &CommandRegistry, wlan: &Arc<WlanManager>) {
    let manager = Arc::clone(wlan);
    registry.register(Command {
        name: "wlan_scan",
        desc: "Rescan for wireless networks.",
        usage: r#"{"jsonrpc": "2.0", "method": "wlan_scan", "id": 42}"#,
        access: Access::User,
        module: "wlan",
        handler: Arc::new(move |request| {
            let manager = Arc::clone(&manager);
            Box::pin(async move {
                match manager.scan().await {
                    Ok(netcount) => message::response_result(
                        &request,
                        serde_json::json!({
                            "netcount": netcount,
                            "last_scan": manager.last_scan(),
                        }),
                    ),
                    Err(e) => {
                        warn!("wireless scan failed: {e}");
                        Some(message::response_error(
                            Some(&request),
                            ErrorCode::InternalError,
                            Some("Internal error - couldn't update wireless network list"),
                        ))
                    }
                }
            })
        }),
    });

    let manager = Arc::clone(wlan);
    registry.register(Command {
        name: "wlan_list",
        desc: "Wireless networks seen in the latest scan.",
        usage: r#"{"jsonrpc": "2.0", "method": "wlan_list", "id": 42}"#,
        access: Access::User,
        module: "wlan",
        handler: Arc::new(move |request| {
            let manager = Arc::clone(&manager);
            Box::pin(async move {
                match manager.scan_results() {
                    Some(results) => message::response_result(
                        &request,
                        serde_json::to_value(results).unwrap_or(Value::Null),
                    ),
                    None => Some(message::response_error(
                        Some(&request),
                        ErrorCode::InternalError,
                        Some("Internal error - please try again later"),
                    )),
                }
            })
        }),
    });

    let manager = Arc::clone(wlan);
    registry.register(Command {
        name: "wlan_list_stored",
        desc: "Stored wireless credentials.",
        usage: r#"{"jsonrpc": "2.0", "method": "wlan_list_stored", "id": 42}"#,
        access: Access::Root,
        module: "wlan",
        handler: Arc::new(move |request| {
            let manager = Arc::clone(&manager);
            Box::pin(async move {
                message::response_result(
                    &request,
                    serde_json::to_value(manager.stored_networks()).unwrap_or(Value::Null),
                )
            })
        }),
    });

    let manager = Arc::clone(wlan);
    registry.register(Command {
        name: "wlan_connect",
        desc: "Associate with a wireless network, optionally storing the credentials.",
        usage: r#"{"jsonrpc": "2.0", "method": "wlan_connect", "params": {"ssid": "...", "key": "...", "store": true}, "id": 42}"#,
        access: Access::Root,
        module: "wlan",
        handler: Arc::new(move |request| {
            let manager = Arc::clone(&manager);
            Box::pin(async move { handle_connect(&manager, request).await })
        }),
    });

    let manager = Arc::clone(wlan);
    registry.register(Command {
        name: "wlan_forget",
        desc: "Drop stored credentials for an SSID.",
        usage: r#"{"jsonrpc": "2.0", "method": "wlan_forget", "params": "ssid", "id": 42}"#,
        access: Access::Root,
        module: "wlan",
        handler: Arc::new(move |request| {
            let manager = Arc::clone(&manager);
            Box::pin(async move {
                let Some(ssid) = message::params(&request).and_then(Value::as_str) else {
                    return Some(message::response_error(
                        Some(&request),
                        ErrorCode::InvalidParams,
                        Some("Invalid parameters - params should be a string"),
                    ));
                };
                match manager.forget(ssid) {
                    Ok(true) => message::response_result(&request, Value::String("OK".into())),
                    Ok(false) => Some(message::response_error(
                        Some(&request),
                        ErrorCode::InvalidParams,
                        Some("No such stored network"),
                    )),
                    Err(e) => Some(message::response_error(
                        Some(&request),
                        ErrorCode::InternalError,
                        Some(&e.to_string()),
                    )),
                }
            })
        }),
    });
}

async fn handle_connect(manager: &Arc<WlanManager>, request: Value) -> Option<Value> {
    let params = match message::params(&request)
        .cloned()
        .and_then(|p| serde_json::from_value::<ConnectParams>(p).ok())
    {
        Some(params) => params,
        None => {
            return Some(message::response_error(
                Some(&request),
                ErrorCode::InvalidParams,
                Some("Invalid parameters - params should be an object with \"ssid\" and \"key\" members"),
            ))
        }
    };

    let network = StoredNetwork::new(params.ssid, params.key);
    if let Err(e) = manager.connect(&network).await {
        warn!("couldn't connect to \"{}\": {e}", network.ssid);
        return Some(message::response_error(
            Some(&request),
            ErrorCode::InternalError,
            Some("Internal error - couldn't connect to the network"),
        ));
    }

    if params.store {
        if let Err(e) = manager.store(network) {
            return Some(message::response_error(
                Some(&request),
                ErrorCode::InternalError,
                Some(&format!("Internal error - couldn't store network credentials: {e}")),
            ));
        }
    }
    message::response_result(&request, Value::String("OK".into()))
}

/// Module glue: load stored credentials and start from a disabled client
/// interface (an out-of-range association can destabilize the AP side when
/// both share a radio).
pub struct WlanModule {
    wlan: Arc<WlanManager>,
}

impl WlanModule {
    pub fn new(wlan: Arc<WlanManager>) -> Arc<Self> {
        Arc::new(Self { wlan })
    }
}

#[async_trait]
impl Module for WlanModule {
    fn name(&self) -> &'static str {
        "wlan"
    }

    fn deps(&self) -> &'static [&'static str] {
        &["netintf"]
    }

    async fn init(&self) -> Result<(), ModuleError> {
        self.wlan.load_stored();
        if let Err(e) = self.wlan.disconnect().await {
            warn!("initial wireless disconnect failed: {e}");
        }
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "wlan_tests.rs"]
mod tests;
