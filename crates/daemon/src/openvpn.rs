// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenVPN control surface: child process management plus the line-based
//! management socket protocol.

use std::path::PathBuf;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::process::Child;
use tracing::{debug, info, warn};

use crate::adapters::{VpnControl, VpnError, VpnStateLine};

const DEFAULT_MGMT_SOCKET: &str = "/run/openvpn/openvpn.sock";
const DEFAULT_CONFIG: &str = "/etc/nakd/openvpn/current.ovpn";
const DEFAULT_BINARY: &str = "/usr/sbin/openvpn";
const DEFAULT_LOG: &str = "/var/log/openvpn.log";

pub struct OpenVpn {
    mgmt_path: PathBuf,
    config_path: PathBuf,
    binary: PathBuf,
    child: tokio::sync::Mutex<Option<Child>>,
}

impl OpenVpn {
    pub fn new() -> Self {
        Self::with_paths(
            PathBuf::from(DEFAULT_MGMT_SOCKET),
            PathBuf::from(DEFAULT_CONFIG),
            PathBuf::from(DEFAULT_BINARY),
        )
    }

    pub fn with_paths(mgmt_path: PathBuf, config_path: PathBuf, binary: PathBuf) -> Self {
        Self { mgmt_path, config_path, binary, child: tokio::sync::Mutex::new(None) }
    }

    /// Run one management command: connect, consume the greeting, send the
    /// command, collect reply lines until `END` (or a single-line reply).
    async fn mgmt_command(&self, command: &str) -> Result<Vec<String>, VpnError> {
        debug!(command, "calling management command");
        let stream = UnixStream::connect(&self.mgmt_path)
            .await
            .map_err(|e| VpnError::Management(format!("couldn't connect: {e}")))?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        // greeting line
        let greeting = lines
            .next_line()
            .await
            .map_err(|e| VpnError::Management(e.to_string()))?
            .ok_or_else(|| VpnError::Management("no greeting line".into()))?;
        debug!("<<{greeting}");

        write_half.write_all(command.as_bytes()).await?;
        write_half.write_all(b"\n").await?;

        let mut reply = Vec::new();
        loop {
            let Some(line) = lines
                .next_line()
                .await
                .map_err(|e| VpnError::Management(e.to_string()))?
            else {
                break;
            };
            debug!("<<{line}");
            if line.starts_with("END") {
                break;
            }
            let single = line.starts_with("SUCCESS") || line.starts_with("ERROR");
            reply.push(line);
            if single {
                break;
            }
        }
        Ok(reply)
    }

    async fn mgmt_signal(&self, signal: &str) -> Result<(), VpnError> {
        let reply = self.mgmt_command(&format!("signal {signal}")).await?;
        match reply.first() {
            Some(line) if line.starts_with("SUCCESS") => Ok(()),
            other => Err(VpnError::Management(format!("unexpected reply: {other:?}"))),
        }
    }
}

impl Default for OpenVpn {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one `time,state[,...]` line from the management `state` command.
pub(crate) fn parse_state_line(line: &str) -> Option<VpnStateLine> {
    let mut parts = line.splitn(3, ',');
    let timestamp = parts.next()?.to_string();
    let state = parts.next()?.to_string();
    if timestamp.is_empty() || state.is_empty() {
        return None;
    }
    Some(VpnStateLine { timestamp, state })
}

#[async_trait]
impl VpnControl for OpenVpn {
    async fn start(&self) -> Result<(), VpnError> {
        if !self.config_path.exists() {
            return Err(VpnError::ConfigMissing(self.config_path.clone()));
        }
        let child = tokio::process::Command::new(&self.binary)
            .arg("--log-append")
            .arg(DEFAULT_LOG)
            .arg("--daemon")
            .arg("--management")
            .arg(&self.mgmt_path)
            .arg("unix")
            .arg("--config")
            .arg(&self.config_path)
            .spawn()
            .map_err(VpnError::Spawn)?;
        info!(pid = child.id(), "started OpenVPN");
        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn stop(&self) -> Result<(), VpnError> {
        let mut guard = self.child.lock().await;
        let Some(mut child) = guard.take() else {
            info!("attempted to stop OpenVPN, but it isn't running");
            return Ok(());
        };

        // the management console reaches the daemonized children; raw
        // signals are the fallback
        if let Err(e) = self.mgmt_signal("SIGTERM").await {
            warn!("management shutdown failed, sending signals: {e}");
            if let Some(pid) = child.id() {
                let pid = Pid::from_raw(pid as i32);
                if kill(pid, Signal::SIGTERM).is_err() {
                    let _ = kill(pid, Signal::SIGKILL);
                }
            }
        }

        info!("waiting for OpenVPN to terminate");
        let _ = child.wait().await;
        Ok(())
    }

    async fn restart(&self) -> Result<(), VpnError> {
        // SIGHUP makes OpenVPN re-read its configuration and reconnect
        self.mgmt_signal("SIGHUP").await
    }

    async fn state(&self) -> Result<Vec<VpnStateLine>, VpnError> {
        let lines = self.mgmt_command("state").await?;
        lines
            .iter()
            .map(|line| {
                parse_state_line(line)
                    .ok_or_else(|| VpnError::Management(format!("couldn't parse state: {line}")))
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "openvpn_tests.rs"]
mod tests;
