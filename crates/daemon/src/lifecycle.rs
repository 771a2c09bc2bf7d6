// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, startup, assembly of the module graph,
//! and shutdown.

use std::fs::File;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use nak_core::{Clock, SystemClock};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::{
    ConfigError, ConfigStore, FileConfig, FsLedSink, LedSink, NetStatus, Shell, SystemShell,
    UbusNetStatus, VpnControl, WlanScanner,
};
use crate::connectivity::{ConnectivityModule, ConnectivityMonitor};
use crate::env;
use crate::event_bus::{EventBus, EventModule};
use crate::led::{LedCtl, LedModule};
use crate::module::{ModuleError, ModuleGraph};
use crate::netintf::{Netintf, NetintfModule};
use crate::notification::Notifications;
use crate::openvpn::OpenVpn;
use crate::rpc::commands::register_core_commands;
use crate::rpc::CommandRegistry;
use crate::server::Server;
use crate::stage::{StageCtl, StageModule};
use crate::timer::{TimerModule, TimerService};
use crate::wlan::{WlanManager, WlanModule};
use crate::workqueue::{Workqueue, WorkqueueModule};

/// Daemon configuration: filesystem paths and pool sizes.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime state directory (e.g. /run/nakd)
    pub state_dir: PathBuf,
    /// Path to the control socket
    pub socket_path: PathBuf,
    /// Path to the lock/PID file
    pub lock_path: PathBuf,
    /// Path to the daemon log file
    pub log_path: PathBuf,
    /// Path to the configuration store file
    pub config_path: PathBuf,
    /// Path to the stored wireless credentials
    pub networks_path: PathBuf,
    /// Helper script directory
    pub script_dir: PathBuf,
    /// Workqueue pool size
    pub workers: usize,
    /// Concurrent client connection cap
    pub max_connections: usize,
}

impl Config {
    pub fn load() -> Self {
        let state_dir = env::state_dir();
        Self {
            socket_path: env::socket_path(),
            lock_path: state_dir.join("nakd.pid"),
            log_path: state_dir.join("nakd.log"),
            config_path: env::config_path(),
            networks_path: env::wireless_networks_path(),
            script_dir: env::script_dir(),
            workers: env::worker_count(),
            max_connections: env::max_connections(),
            state_dir,
        }
    }
}

/// External collaborators, injectable for tests.
pub struct Adapters {
    pub shell: Arc<dyn Shell>,
    pub config: Arc<dyn ConfigStore>,
    pub netstatus: Arc<dyn NetStatus>,
    pub scanner: Arc<dyn WlanScanner>,
    pub vpn: Arc<dyn VpnControl>,
    pub led_sink: Arc<dyn LedSink>,
    pub clock: Arc<dyn Clock>,
}

impl Adapters {
    /// Production wiring.
    pub fn production(config: &Config) -> Result<Self, LifecycleError> {
        let shell: Arc<dyn Shell> = Arc::new(SystemShell);
        let store: Arc<dyn ConfigStore> = Arc::new(FileConfig::load(&config.config_path)?);
        Ok(Self {
            netstatus: Arc::new(UbusNetStatus::new(Arc::clone(&shell))),
            scanner: Arc::new(crate::adapters::ScriptScanner::new(
                Arc::clone(&shell),
                &config.script_dir,
            )),
            vpn: Arc::new(OpenVpn::new()),
            led_sink: Arc::new(FsLedSink::new(Arc::clone(&store))),
            clock: Arc::new(SystemClock),
            config: store,
            shell,
        })
    }
}

/// All daemon components plus the module graph that owns their lifetimes.
pub struct Daemon {
    pub workqueue: Arc<Workqueue>,
    pub timers: Arc<TimerService>,
    pub events: Arc<EventBus>,
    pub netintf: Arc<Netintf>,
    pub wlan: Arc<WlanManager>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub stage: Arc<StageCtl>,
    pub leds: Arc<LedCtl>,
    pub commands: Arc<CommandRegistry>,
    graph: ModuleGraph,
}

impl Daemon {
    /// Construct every component and wire the module graph. Nothing runs
    /// until `init`.
    pub fn new(config: &Config, adapters: Adapters) -> Arc<Self> {
        let timers = TimerService::new();
        let workqueue = Workqueue::new(config.workers);
        let events = EventBus::new(Arc::clone(&workqueue));
        let netintf = Netintf::new(
            Arc::clone(&adapters.netstatus),
            Arc::clone(&adapters.config),
            Arc::clone(&events),
        );
        let wlan = WlanManager::new(
            Arc::clone(&adapters.scanner),
            Arc::clone(&adapters.config),
            Arc::clone(&adapters.shell),
            Arc::clone(&netintf),
            Arc::clone(&adapters.clock),
            config.networks_path.clone(),
            config.script_dir.clone(),
        );
        let connectivity = ConnectivityMonitor::new(
            Arc::clone(&netintf),
            Arc::clone(&wlan),
            Arc::clone(&events),
            Arc::clone(&adapters.shell),
            config.script_dir.clone(),
        );
        let leds = LedCtl::new(Arc::clone(&adapters.led_sink));
        let stage = StageCtl::new(
            Arc::clone(&adapters.config),
            Arc::clone(&adapters.vpn),
            Arc::clone(&adapters.shell),
            Arc::clone(&workqueue),
            Arc::clone(&connectivity),
            Arc::clone(&leds),
            config.script_dir.clone(),
        );

        let commands = CommandRegistry::new();
        register_core_commands(
            &commands,
            Arc::clone(&adapters.shell),
            Arc::clone(&adapters.vpn),
            config.script_dir.clone(),
        );
        crate::netintf::register_commands(&commands, &netintf);
        crate::connectivity::register_commands(&commands, &connectivity);
        crate::wlan::register_commands(&commands, &wlan);
        crate::stage::register_commands(&commands, &stage);

        let mut graph = ModuleGraph::new();
        graph.register(TimerModule::new(Arc::clone(&timers)));
        graph.register(WorkqueueModule::new(Arc::clone(&workqueue), Arc::clone(&timers)));
        graph.register(EventModule::new(Arc::clone(&events)));
        graph.register(NetintfModule::new(
            Arc::clone(&netintf),
            Arc::clone(&timers),
            Arc::clone(&workqueue),
        ));
        graph.register(WlanModule::new(Arc::clone(&wlan)));
        graph.register(LedModule::new(
            Arc::clone(&leds),
            Arc::clone(&timers),
            Arc::clone(&workqueue),
        ));
        graph.register(Notifications::new(Arc::clone(&events), Arc::clone(&leds)));
        graph.register(ConnectivityModule::new(
            Arc::clone(&connectivity),
            Arc::clone(&events),
            Arc::clone(&timers),
            Arc::clone(&workqueue),
        ));
        graph.register(StageModule::new(
            Arc::clone(&stage),
            Arc::clone(&events),
            Arc::clone(&timers),
        ));

        Arc::new(Self {
            workqueue,
            timers,
            events,
            netintf,
            wlan,
            connectivity,
            stage,
            leds,
            commands,
            graph,
        })
    }

    pub async fn init(&self) -> Result<(), ModuleError> {
        self.graph.init_all().await
    }

    pub async fn cleanup(&self) {
        self.graph.cleanup_all().await;
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive PID lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub daemon: Arc<Daemon>,
    /// Cancelled to stop the server and connection tasks.
    pub shutdown: CancellationToken,
}

impl DaemonState {
    /// Spawn the connection server for this daemon.
    pub fn serve(&self, listener: UnixListener) {
        let server = Server::new(
            listener,
            Arc::clone(&self.daemon.commands),
            self.config.max_connections,
            self.shutdown.clone(),
        );
        tokio::spawn(server.run());
    }

    /// Graceful shutdown: stop connections, tear the module graph down,
    /// remove the socket and PID files.
    pub async fn shutdown(&self) {
        info!("shutting down daemon...");
        self.shutdown.cancel();
        self.daemon.cleanup().await;

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("failed to remove socket file: {e}");
            }
        }
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("failed to remove PID file: {e}");
            }
        }
        info!("daemon shutdown complete");
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon: state dir, PID lock, socket, module graph.
pub async fn startup(
    config: Config,
    adapters: Adapters,
) -> Result<(DaemonState, UnixListener), LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    let lock_file = acquire_lock(&config.lock_path)?;

    // remove a stale socket from a previous run
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;
    // world-writable: authorization is credential-based, currently coarse
    std::fs::set_permissions(&config.socket_path, std::fs::Permissions::from_mode(0o777))?;
    info!(socket = %config.socket_path.display(), "listening");

    let daemon = Daemon::new(&config, adapters);
    daemon.init().await?;

    let state = DaemonState {
        config,
        lock_file,
        daemon,
        shutdown: CancellationToken::new(),
    };
    Ok((state, listener))
}

/// Create the PID file, take the exclusive write lock, and record our pid.
fn acquire_lock(path: &std::path::Path) -> Result<File, LifecycleError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
