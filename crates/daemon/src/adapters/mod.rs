// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter seams around the daemon's external collaborators.
//!
//! Each seam is a trait with a production implementation and a `Fake*`
//! counterpart used by the test suites: the shell executor, the hierarchical
//! configuration store, the device-status provider, the wireless scanner,
//! the VPN control surface, and the LED sinks.

mod config;
mod led_sink;
mod netstatus;
mod scanner;
mod shell;
mod vpn;

pub use config::{ConfigError, ConfigStore, FileConfig, MemConfig};
pub use led_sink::{FakeLedSink, FsLedSink, LedSink};
pub use netstatus::{FakeNetStatus, NetStatus, NetStatusError, UbusNetStatus};
pub use scanner::{FakeScanner, ScanError, ScriptScanner, WlanScanner};
pub use shell::{
    any_executable_succeeds, run_executables, FakeShell, Shell, ShellError, ShellOutput,
    SystemShell,
};
pub use vpn::{FakeVpn, VpnControl, VpnError, VpnStateLine};
