// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic timer service.
//!
//! Each timer runs on its own interval task. Handlers must be non-blocking;
//! the typical body enqueues a workqueue task, consulting duplicate
//! suppression so overlapping ticks coalesce. Removal deactivates the timer
//! under the table lock before tearing the task down, so a tick already in
//! flight observes the inactive flag and becomes a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::module::{Module, ModuleError};

struct TimerEntry {
    name: &'static str,
    active: bool,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub struct TimerHandle {
    id: u64,
}

#[derive(Default)]
pub struct TimerService {
    table: Arc<Mutex<HashMap<u64, TimerEntry>>>,
    next_id: AtomicU64,
}

impl TimerService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a periodic timer. The first invocation happens one full
    /// interval after registration.
    pub fn add(
        &self,
        name: &'static str,
        interval: Duration,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        self.table
            .lock()
            .insert(id, TimerEntry { name, active: true, cancel: cancel.clone() });
        debug!(timer = name, interval_ms = interval.as_millis() as u64, "added timer");

        let table = Arc::clone(&self.table);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut tick = tokio::time::interval_at(start, interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tick.tick() => {
                        // the handler runs under the table lock; removal
                        // after this point is observed on the next tick
                        let guard = table.lock();
                        match guard.get(&id) {
                            Some(entry) if entry.active => handler(),
                            _ => return,
                        }
                    }
                }
            }
        });

        TimerHandle { id }
    }

    /// Deactivate and delete a timer. An expiration already being delivered
    /// is a no-op after this returns.
    pub fn remove(&self, handle: TimerHandle) {
        match self.table.lock().remove(&handle.id) {
            Some(entry) => {
                debug!(timer = entry.name, "removed timer");
                entry.cancel.cancel();
            }
            None => warn!("tried to remove nonexistent timer"),
        }
    }

    pub fn remove_all(&self) {
        for (_, entry) in self.table.lock().drain() {
            entry.cancel.cancel();
        }
    }

    pub fn active_count(&self) -> usize {
        self.table.lock().values().filter(|e| e.active).count()
    }
}

/// Module glue for the timer service.
pub struct TimerModule {
    timers: Arc<TimerService>,
}

impl TimerModule {
    pub fn new(timers: Arc<TimerService>) -> Arc<Self> {
        Arc::new(Self { timers })
    }
}

#[async_trait]
impl Module for TimerModule {
    fn name(&self) -> &'static str {
        "timer"
    }

    async fn init(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        self.timers.remove_all();
        Ok(())
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
