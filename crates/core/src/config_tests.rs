// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn string_value_matches_case_insensitively() {
    let value = ConfigValue::Str("VPN".into());
    assert!(value.matches_ignore_case("vpn"));
    assert!(!value.matches_ignore_case("tor"));
}

#[test]
fn list_value_matches_any_element() {
    let value = ConfigValue::List(vec!["online".into(), "vpn".into()]);
    assert!(value.matches_ignore_case("VPN"));
    assert!(value.matches_ignore_case("online"));
    assert!(!value.matches_ignore_case("reset"));
}

#[test]
fn as_str_only_for_strings() {
    assert_eq!(ConfigValue::Str("x".into()).as_str(), Some("x"));
    assert_eq!(ConfigValue::List(vec!["x".into()]).as_str(), None);
}

#[test]
fn sections_with_option_filters_by_presence() {
    let mut pkg = ConfigPackage::default();
    let mut allow = ConfigSection::default();
    allow.set("nak_rule_enable", "vpn");
    allow.set("enabled", "0");
    let mut other = ConfigSection::default();
    other.set("name", "unrelated");
    pkg.sections.insert("allow_tunnel".into(), allow);
    pkg.sections.insert("misc".into(), other);

    assert_eq!(pkg.sections_with_option("nak_rule_enable"), vec!["allow_tunnel".to_string()]);
    assert!(pkg.sections_with_option("nak_rule_disable").is_empty());
}

#[test]
fn untagged_values_deserialize_from_toml_shapes() {
    let section: ConfigSection = serde_json::from_value(serde_json::json!({
        "nak_rule_disable": ["online", "vpn"],
        "enabled": "1",
    }))
    .unwrap();
    assert_eq!(section.option_str("enabled"), Some("1"));
    assert!(section
        .option("nak_rule_disable")
        .is_some_and(|v| v.matches_ignore_case("vpn")));
}
