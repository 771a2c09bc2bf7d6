// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Module graph: deterministic, dependency-ordered init and teardown.
//!
//! Modules are registered once at daemon start and form a DAG through their
//! declared dependency names. `init_all` initializes dependencies first;
//! `cleanup_all` is symmetric, cleaning a module only after every module
//! that depends on it has been cleaned. A missing dependency or a cycle is
//! a programming error surfaced as a fatal startup failure.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Module {module} depends on unknown module {dep}")]
    MissingDependency { module: String, dep: String },

    #[error("Dependency cycle through module {module}")]
    DependencyCycle { module: String },

    #[error("Couldn't initialize module {module}: {message}")]
    Init { module: String, message: String },

    #[error("Couldn't clean up module {module}: {message}")]
    Cleanup { module: String, message: String },
}

impl ModuleError {
    pub fn init(module: &str, message: impl std::fmt::Display) -> Self {
        ModuleError::Init { module: module.to_string(), message: message.to_string() }
    }

    pub fn cleanup(module: &str, message: impl std::fmt::Display) -> Self {
        ModuleError::Cleanup { module: module.to_string(), message: message.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Removed,
    Initializing,
    Initialized,
    Removing,
}

#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    fn deps(&self) -> &'static [&'static str] {
        &[]
    }

    async fn init(&self) -> Result<(), ModuleError>;

    async fn cleanup(&self) -> Result<(), ModuleError>;
}

struct ModuleEntry {
    module: Arc<dyn Module>,
    state: Mutex<ModuleState>,
}

/// Registry of all daemon modules, in declaration order.
#[derive(Default)]
pub struct ModuleGraph {
    entries: Vec<ModuleEntry>,
}

type BoxedInit<'a> = Pin<Box<dyn Future<Output = Result<(), ModuleError>> + Send + 'a>>;
type BoxedCleanup<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.entries.push(ModuleEntry { module, state: Mutex::new(ModuleState::Removed) });
    }

    pub fn state(&self, name: &str) -> Option<ModuleState> {
        self.index_of(name).map(|idx| *self.entries[idx].state.lock())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.module.name() == name)
    }

    /// Initialize every registered module, dependencies first.
    pub async fn init_all(&self) -> Result<(), ModuleError> {
        for idx in 0..self.entries.len() {
            if *self.entries[idx].state.lock() != ModuleState::Removed {
                continue;
            }
            self.init_entry(idx).await?;
        }
        Ok(())
    }

    fn init_entry(&self, idx: usize) -> BoxedInit<'_> {
        Box::pin(async move {
            let entry = &self.entries[idx];
            let name = entry.module.name();
            {
                let mut state = entry.state.lock();
                match *state {
                    ModuleState::Initialized => return Ok(()),
                    // a repeat visit while initializing means a cycle
                    ModuleState::Initializing => {
                        return Err(ModuleError::DependencyCycle { module: name.to_string() })
                    }
                    _ => *state = ModuleState::Initializing,
                }
            }
            debug!(module = name, "initializing module");

            for dep in entry.module.deps() {
                let didx = self.index_of(dep).ok_or_else(|| ModuleError::MissingDependency {
                    module: name.to_string(),
                    dep: dep.to_string(),
                })?;
                if didx == idx {
                    return Err(ModuleError::DependencyCycle { module: name.to_string() });
                }
                self.init_entry(didx).await?;
            }

            entry.module.init().await?;
            *entry.state.lock() = ModuleState::Initialized;
            debug!(module = name, "initialized module");
            Ok(())
        })
    }

    /// Clean up every module, reverse-topologically. Cleanup failures are
    /// logged; teardown continues.
    pub async fn cleanup_all(&self) {
        for idx in 0..self.entries.len() {
            self.cleanup_entry(idx).await;
        }
    }

    fn cleanup_entry(&self, idx: usize) -> BoxedCleanup<'_> {
        Box::pin(async move {
            let entry = &self.entries[idx];
            let name = entry.module.name();
            {
                let mut state = entry.state.lock();
                if *state != ModuleState::Initialized {
                    return;
                }
                *state = ModuleState::Removing;
            }
            debug!(module = name, "cleaning up module");

            // dependent modules go first
            for (didx, dependent) in self.entries.iter().enumerate() {
                if dependent.module.deps().contains(&name) {
                    self.cleanup_entry(didx).await;
                }
            }

            if let Err(e) = entry.module.cleanup().await {
                error!(module = name, "cleanup failed: {e}");
            }
            *entry.state.lock() = ModuleState::Removed;
            debug!(module = name, "cleaned up module");
        })
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod tests;
