// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Daemon version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Resolve the runtime state directory: `NAKD_STATE_DIR` > `/run/nakd`.
pub fn state_dir() -> PathBuf {
    match std::env::var("NAKD_STATE_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/run/nakd"),
    }
}

/// Control socket path: `NAKD_SOCKET` > `<state>/nakd.sock`.
pub fn socket_path() -> PathBuf {
    match std::env::var("NAKD_SOCKET") {
        Ok(path) => PathBuf::from(path),
        Err(_) => state_dir().join("nakd.sock"),
    }
}

/// Configuration store file: `NAKD_CONFIG` > `/etc/nakd/config.toml`.
pub fn config_path() -> PathBuf {
    match std::env::var("NAKD_CONFIG") {
        Ok(path) => PathBuf::from(path),
        Err(_) => PathBuf::from("/etc/nakd/config.toml"),
    }
}

/// Stored wireless credentials: `NAKD_WIRELESS_NETWORKS` >
/// `/etc/nakd/wireless_networks`.
pub fn wireless_networks_path() -> PathBuf {
    match std::env::var("NAKD_WIRELESS_NETWORKS") {
        Ok(path) => PathBuf::from(path),
        Err(_) => PathBuf::from("/etc/nakd/wireless_networks"),
    }
}

/// Helper script directory: `NAKD_SCRIPT_DIR` > `/usr/share/nakd/scripts`.
pub fn script_dir() -> PathBuf {
    match std::env::var("NAKD_SCRIPT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/usr/share/nakd/scripts"),
    }
}

/// Workqueue worker count: `NAKD_WORKERS` > 8.
pub fn worker_count() -> usize {
    std::env::var("NAKD_WORKERS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(crate::workqueue::DEFAULT_WORKERS)
}

/// Concurrent client connection cap: `NAKD_MAX_CONNECTIONS` > 32.
pub fn max_connections() -> usize {
    std::env::var("NAKD_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(32)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
