// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;
use tokio::io::AsyncReadExt;
use tokio::net::UnixListener;

#[test]
fn parses_state_lines() {
    let line = parse_state_line("1451602800,CONNECTED,SUCCESS,10.8.0.2,198.51.100.7").unwrap();
    assert_eq!(line.timestamp, "1451602800");
    assert_eq!(line.state, "CONNECTED");

    let line = parse_state_line("1451602800,EXITING").unwrap();
    assert_eq!(line.state, "EXITING");
}

#[test]
fn rejects_malformed_state_lines() {
    assert!(parse_state_line("no-comma-here").is_none());
    assert!(parse_state_line(",MISSING_TIME").is_none());
    assert!(parse_state_line("123,").is_none());
}

#[tokio::test]
async fn start_requires_the_config_file() {
    let temp = tempdir().unwrap();
    let vpn = OpenVpn::with_paths(
        temp.path().join("mgmt.sock"),
        temp.path().join("absent.ovpn"),
        PathBuf::from("/usr/sbin/openvpn"),
    );
    assert!(matches!(vpn.start().await, Err(VpnError::ConfigMissing(_))));
}

#[tokio::test]
async fn stop_without_a_child_is_a_no_op() {
    let temp = tempdir().unwrap();
    let vpn = OpenVpn::with_paths(
        temp.path().join("mgmt.sock"),
        temp.path().join("absent.ovpn"),
        PathBuf::from("/usr/sbin/openvpn"),
    );
    vpn.stop().await.unwrap();
}

/// Serve one scripted management exchange on a temp socket.
async fn scripted_mgmt(listener: UnixListener, reply: &'static str) {
    let (mut stream, _) = listener.accept().await.unwrap();
    stream.write_all(b">INFO:OpenVPN Management Interface\n").await.unwrap();
    let mut buf = [0u8; 256];
    let _ = stream.read(&mut buf).await.unwrap();
    stream.write_all(reply.as_bytes()).await.unwrap();
}

#[tokio::test]
async fn state_reads_lines_until_end() {
    let temp = tempdir().unwrap();
    let mgmt = temp.path().join("mgmt.sock");
    let listener = UnixListener::bind(&mgmt).unwrap();
    tokio::spawn(scripted_mgmt(
        listener,
        "1451602800,CONNECTED,SUCCESS\n1451602900,RECONNECTING\nEND\n",
    ));

    let vpn = OpenVpn::with_paths(mgmt, temp.path().join("c.ovpn"), PathBuf::from("/bin/true"));
    let lines = vpn.state().await.unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].state, "CONNECTED");
    assert_eq!(lines[1].state, "RECONNECTING");
}

#[tokio::test]
async fn restart_signals_over_the_management_socket() {
    let temp = tempdir().unwrap();
    let mgmt = temp.path().join("mgmt.sock");
    let listener = UnixListener::bind(&mgmt).unwrap();
    tokio::spawn(scripted_mgmt(listener, "SUCCESS: signal SIGHUP thrown\n"));

    let vpn = OpenVpn::with_paths(mgmt, temp.path().join("c.ovpn"), PathBuf::from("/bin/true"));
    vpn.restart().await.unwrap();
}

#[tokio::test]
async fn unreachable_management_socket_is_an_error() {
    let temp = tempdir().unwrap();
    let vpn = OpenVpn::with_paths(
        temp.path().join("nobody-home.sock"),
        temp.path().join("c.ovpn"),
        PathBuf::from("/bin/true"),
    );
    assert!(matches!(vpn.restart().await, Err(VpnError::Management(_))));
}
