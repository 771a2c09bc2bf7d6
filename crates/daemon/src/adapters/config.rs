// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration store seam.
//!
//! Hierarchy: packages → sections → options, values string or list. All
//! callers are serialized through the store's lock; a mutation followed by
//! `commit` is the atomic save→commit→unload unit.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use nak_core::config::{ConfigPackage, ConfigValue};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

type Root = IndexMap<String, ConfigPackage>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration file {0}: {1}")]
    Parse(PathBuf, String),

    #[error("Could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub trait ConfigStore: Send + Sync {
    /// Names of all known packages.
    fn packages(&self) -> Vec<String>;

    /// Snapshot of one package.
    fn package(&self, name: &str) -> Option<ConfigPackage>;

    fn get_option(&self, package: &str, section: &str, option: &str) -> Option<ConfigValue>;

    /// Set an option, creating the package and section as needed. The change
    /// is in-memory until `commit`.
    fn set_option(
        &self,
        package: &str,
        section: &str,
        option: &str,
        value: ConfigValue,
    ) -> Result<(), ConfigError>;

    /// Persist pending changes for a package.
    fn commit(&self, package: &str) -> Result<(), ConfigError>;

    fn option_str(&self, package: &str, section: &str, option: &str) -> Option<String> {
        self.get_option(package, section, option)
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

fn set_in_root(root: &mut Root, package: &str, section: &str, option: &str, value: ConfigValue) {
    root.entry(package.to_string())
        .or_default()
        .sections
        .entry(section.to_string())
        .or_default()
        .options
        .insert(option.to_string(), value);
}

/// TOML-file-backed store.
pub struct FileConfig {
    path: PathBuf,
    root: Mutex<Root>,
}

impl FileConfig {
    /// Load the store from `path`. A missing file yields an empty store; a
    /// malformed one is a configuration error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let root = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "no configuration file, starting empty");
                Root::default()
            }
            Err(e) => return Err(e.into()),
        };
        info!(path = %path.display(), packages = root.len(), "loaded configuration");
        Ok(Self { path: path.to_path_buf(), root: Mutex::new(root) })
    }
}

impl ConfigStore for FileConfig {
    fn packages(&self) -> Vec<String> {
        self.root.lock().keys().cloned().collect()
    }

    fn package(&self, name: &str) -> Option<ConfigPackage> {
        self.root.lock().get(name).cloned()
    }

    fn get_option(&self, package: &str, section: &str, option: &str) -> Option<ConfigValue> {
        self.root.lock().get(package)?.section(section)?.option(option).cloned()
    }

    fn set_option(
        &self,
        package: &str,
        section: &str,
        option: &str,
        value: ConfigValue,
    ) -> Result<(), ConfigError> {
        set_in_root(&mut self.root.lock(), package, section, option, value);
        Ok(())
    }

    fn commit(&self, package: &str) -> Result<(), ConfigError> {
        let guard = self.root.lock();
        info!(package, "committing configuration");
        let text = toml::to_string_pretty(&*guard)?;
        // write-then-rename keeps the file whole across a crash
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemConfig {
    root: Mutex<Root>,
}

impl MemConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style option seeding.
    pub fn with(self, package: &str, section: &str, option: &str, value: ConfigValue) -> Self {
        set_in_root(&mut self.root.lock(), package, section, option, value);
        self
    }
}

impl ConfigStore for MemConfig {
    fn packages(&self) -> Vec<String> {
        self.root.lock().keys().cloned().collect()
    }

    fn package(&self, name: &str) -> Option<ConfigPackage> {
        self.root.lock().get(name).cloned()
    }

    fn get_option(&self, package: &str, section: &str, option: &str) -> Option<ConfigValue> {
        self.root.lock().get(package)?.section(section)?.option(option).cloned()
    }

    fn set_option(
        &self,
        package: &str,
        section: &str,
        option: &str,
        value: ConfigValue,
    ) -> Result<(), ConfigError> {
        set_in_root(&mut self.root.lock(), package, section, option, value);
        Ok(())
    }

    fn commit(&self, _package: &str) -> Result<(), ConfigError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
