// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn wan_role() -> Vec<(InterfaceRole, String)> {
    vec![(InterfaceRole::Wan, "eth0".to_string())]
}

#[test]
fn rising_carrier_fires_plugged_once() {
    let prev = json!({"eth0": {"carrier": false}});
    let last = json!({"eth0": {"carrier": true}});
    let events = carrier_edges(&prev, &last, &wan_role());
    assert_eq!(events, vec![Event::EthWanPlugged]);

    // A third identical poll delivers no further event.
    let events = carrier_edges(&last, &last.clone(), &wan_role());
    assert!(events.is_empty());
}

#[test]
fn falling_carrier_fires_lost() {
    let prev = json!({"eth0": {"carrier": true}});
    let last = json!({"eth0": {"carrier": false}});
    let events = carrier_edges(&prev, &last, &wan_role());
    assert_eq!(events, vec![Event::EthWanLost]);
}

#[test]
fn lan_and_wlan_roles_map_to_their_events() {
    let roles = vec![
        (InterfaceRole::Lan, "eth1".to_string()),
        (InterfaceRole::Wlan, "wlan0".to_string()),
    ];
    let prev = json!({"eth1": {"carrier": false}, "wlan0": {"carrier": true}});
    let last = json!({"eth1": {"carrier": true}, "wlan0": {"carrier": false}});
    let events = carrier_edges(&prev, &last, &roles);
    assert_eq!(events, vec![Event::EthLanPlugged, Event::WirelessLost]);
}

#[test]
fn ap_role_produces_no_event() {
    let roles = vec![(InterfaceRole::Ap, "wlan0".to_string())];
    let prev = json!({"wlan0": {"carrier": false}});
    let last = json!({"wlan0": {"carrier": true}});
    assert!(carrier_edges(&prev, &last, &roles).is_empty());
}

#[test]
fn missing_interface_produces_no_edge() {
    let prev = json!({});
    let last = json!({"eth0": {"carrier": true}});
    assert!(carrier_edges(&prev, &last, &wan_role()).is_empty());
}

#[test]
fn non_boolean_carrier_is_ignored() {
    let prev = json!({"eth0": {"carrier": "up"}});
    let last = json!({"eth0": {"carrier": true}});
    assert!(carrier_edges(&prev, &last, &wan_role()).is_empty());
}

#[test]
fn snapshot_push_retires_previous() {
    let mut snap = NetSnapshot::default();
    snap.push(json!({"eth0": {"carrier": false}}));
    snap.push(json!({"eth0": {"carrier": true}}));
    assert_eq!(snap.previous.as_ref().unwrap()["eth0"]["carrier"], false);
    assert_eq!(snap.carrier("eth0"), Some(true));
    assert!(snap.interface("eth9").is_none());
}
