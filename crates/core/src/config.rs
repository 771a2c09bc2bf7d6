// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration store value types.
//!
//! The store is hierarchical: packages contain named sections, sections
//! contain options, and an option value is either a string or a list of
//! strings. Section and option order is preserved.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An option value: a plain string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Str(String),
    List(Vec<String>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            ConfigValue::List(_) => None,
        }
    }

    /// True when the string value, or any list element, equals `needle`
    /// case-insensitively. This is how stage hooks match their target.
    pub fn matches_ignore_case(&self, needle: &str) -> bool {
        match self {
            ConfigValue::Str(s) => s.eq_ignore_ascii_case(needle),
            ConfigValue::List(items) => items.iter().any(|s| s.eq_ignore_ascii_case(needle)),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

/// A named group of options within a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSection {
    #[serde(flatten)]
    pub options: IndexMap<String, ConfigValue>,
}

impl ConfigSection {
    pub fn option(&self, name: &str) -> Option<&ConfigValue> {
        self.options.get(name)
    }

    pub fn option_str(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(ConfigValue::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ConfigValue>) {
        self.options.insert(name.into(), value.into());
    }
}

/// A package: an ordered map of sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigPackage {
    #[serde(flatten)]
    pub sections: IndexMap<String, ConfigSection>,
}

impl ConfigPackage {
    pub fn section(&self, name: &str) -> Option<&ConfigSection> {
        self.sections.get(name)
    }

    /// Names of sections carrying an option called `option_name`.
    pub fn sections_with_option(&self, option_name: &str) -> Vec<String> {
        self.sections
            .iter()
            .filter(|(_, section)| section.options.contains_key(option_name))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
