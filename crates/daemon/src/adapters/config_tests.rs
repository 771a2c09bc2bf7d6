// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

const SAMPLE: &str = r#"
[firewall.allow_tunnel]
name = "Allow tunnel traffic"
nak_rule_enable = "vpn"
enabled = "0"

[firewall.block_all]
nak_rule_disable = ["online", "vpn"]
enabled = "1"

[nakd.interfaces]
wan = "eth0"
wlan = "wlan0"
"#;

#[test]
fn loads_packages_sections_and_values() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = FileConfig::load(&path).unwrap();
    let mut packages = config.packages();
    packages.sort();
    assert_eq!(packages, vec!["firewall".to_string(), "nakd".to_string()]);

    assert_eq!(config.option_str("nakd", "interfaces", "wan"), Some("eth0".to_string()));
    let rule = config.get_option("firewall", "block_all", "nak_rule_disable").unwrap();
    assert!(rule.matches_ignore_case("VPN"));
}

#[test]
fn missing_file_starts_empty() {
    let temp = tempdir().unwrap();
    let config = FileConfig::load(&temp.path().join("absent.toml")).unwrap();
    assert!(config.packages().is_empty());
}

#[test]
fn malformed_file_is_an_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "not { toml").unwrap();
    assert!(matches!(FileConfig::load(&path), Err(ConfigError::Parse(..))));
}

#[test]
fn set_commit_reload_round_trip() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = FileConfig::load(&path).unwrap();
    config.set_option("nakd", "stage", "desired", "vpn".into()).unwrap();
    config
        .set_option("firewall", "allow_tunnel", "enabled", "1".into())
        .unwrap();
    config.commit("nakd").unwrap();

    let reloaded = FileConfig::load(&path).unwrap();
    assert_eq!(reloaded.option_str("nakd", "stage", "desired"), Some("vpn".to_string()));
    assert_eq!(
        reloaded.option_str("firewall", "allow_tunnel", "enabled"),
        Some("1".to_string())
    );
}

#[test]
fn set_creates_missing_package_and_section() {
    let config = MemConfig::new();
    config.set_option("wireless", "sta", "ssid", "Home".into()).unwrap();
    assert_eq!(config.option_str("wireless", "sta", "ssid"), Some("Home".to_string()));
}

#[test]
fn mem_config_builder_seeds_options() {
    let config = MemConfig::new().with("nakd", "interfaces", "wan", "eth0".into());
    assert_eq!(config.option_str("nakd", "interfaces", "wan"), Some("eth0".to_string()));
    assert!(config.get_option("nakd", "interfaces", "lan").is_none());
}
