// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn candidate_is_first_scanned_with_credentials() {
    let scanned = vec![
        ScanEntry::new("CoffeeShop"),
        ScanEntry::new("Home"),
        ScanEntry::new("Office"),
    ];
    let stored = vec![
        StoredNetwork::new("Office", "secret1"),
        StoredNetwork::new("Home", "secret2"),
    ];
    // "Home" is scanned before "Office", so it wins despite storage order.
    let candidate = select_candidate(&scanned, &stored).unwrap();
    assert_eq!(candidate.ssid, "Home");
    assert_eq!(candidate.key, "secret2");
}

#[test]
fn no_overlap_means_no_candidate() {
    let scanned = vec![ScanEntry::new("Stranger")];
    let stored = vec![StoredNetwork::new("Home", "secret")];
    assert!(select_candidate(&scanned, &stored).is_none());
}

#[test]
fn empty_scan_means_no_candidate() {
    let stored = vec![StoredNetwork::new("Home", "secret")];
    assert!(select_candidate(&[], &stored).is_none());
}

#[test]
fn scan_entry_keeps_extra_fields() {
    let entry: ScanEntry =
        serde_json::from_value(json!({"ssid": "Home", "signal": -52, "channel": 6})).unwrap();
    assert_eq!(entry.ssid, "Home");
    assert_eq!(entry.extra["signal"], -52);

    let back = serde_json::to_value(&entry).unwrap();
    assert_eq!(back["channel"], 6);
}

#[test]
fn plain_scan_entry_serializes_without_extra() {
    let entry = ScanEntry::new("Home");
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json, json!({"ssid": "Home"}));
}
