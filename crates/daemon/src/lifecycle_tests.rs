// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::{FakeLedSink, FakeNetStatus, FakeScanner, FakeShell, FakeVpn, MemConfig};
use nak_core::FakeClock;
use tempfile::tempdir;

fn test_config(dir: &std::path::Path) -> Config {
    Config {
        state_dir: dir.to_path_buf(),
        socket_path: dir.join("nakd.sock"),
        lock_path: dir.join("nakd.pid"),
        log_path: dir.join("nakd.log"),
        config_path: dir.join("config.toml"),
        networks_path: dir.join("wireless_networks"),
        script_dir: dir.join("scripts"),
        workers: 2,
        max_connections: 4,
    }
}

fn fake_adapters() -> Adapters {
    Adapters {
        shell: Arc::new(FakeShell::new()),
        config: Arc::new(MemConfig::new()),
        netstatus: Arc::new(FakeNetStatus::new()),
        scanner: Arc::new(FakeScanner::new()),
        vpn: Arc::new(FakeVpn::new()),
        led_sink: Arc::new(FakeLedSink::new()),
        clock: Arc::new(FakeClock::new()),
    }
}

#[tokio::test]
async fn startup_creates_pid_file_and_socket() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    let (state, _listener) = startup(config.clone(), fake_adapters()).await.unwrap();

    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert!(config.socket_path.exists());

    state.shutdown().await;
    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
}

#[tokio::test]
async fn startup_replaces_a_stale_socket() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    std::fs::write(&config.socket_path, "stale").unwrap();

    let (state, _listener) = startup(config.clone(), fake_adapters()).await.unwrap();
    assert!(config.socket_path.exists());
    state.shutdown().await;
}

#[tokio::test]
async fn daemon_registers_the_full_command_surface() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    let daemon = Daemon::new(&config, fake_adapters());

    for name in [
        "list",
        "update",
        "openvpn",
        "interfaces",
        "connectivity",
        "stage_set",
        "stage_info",
        "wlan_scan",
        "wlan_list",
        "wlan_list_stored",
        "wlan_connect",
        "wlan_forget",
    ] {
        assert!(daemon.commands.get(name).is_some(), "missing command {name}");
    }
}

#[tokio::test]
async fn init_then_cleanup_round_trips_the_module_graph() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    let daemon = Daemon::new(&config, fake_adapters());

    daemon.init().await.unwrap();
    // stage restore + initial reconcile land on the workqueue
    daemon.cleanup().await;
    // all timers were deregistered on the way down
    assert_eq!(daemon.timers.active_count(), 0);
}
