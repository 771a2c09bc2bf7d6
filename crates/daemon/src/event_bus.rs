// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus: many-to-many event→handler registration.
//!
//! `push` never runs handlers on the producer thread: each active handler
//! matching the event is wrapped in a workqueue task named after the event.
//! Handlers must tolerate being dropped when the workqueue shuts down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use nak_core::Event;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::module::{Module, ModuleError};
use crate::workqueue::{Work, Workqueue};

pub type EventHandler = Arc<dyn Fn(Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

struct Registration {
    id: u64,
    event: Event,
    active: bool,
    handler: EventHandler,
}

pub struct EventBus {
    wq: Arc<Workqueue>,
    handlers: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new(wq: Arc<Workqueue>) -> Arc<Self> {
        Arc::new(Self { wq, handlers: Mutex::new(Vec::new()), next_id: AtomicU64::new(0) })
    }

    pub fn add_handler(&self, event: Event, handler: impl Fn(Event) + Send + Sync + 'static) -> HandlerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().push(Registration {
            id,
            event,
            active: true,
            handler: Arc::new(handler),
        });
        debug!(event = %event, "added event handler");
        HandlerId(id)
    }

    pub fn remove_handler(&self, id: HandlerId) {
        let mut guard = self.handlers.lock();
        if let Some(reg) = guard.iter_mut().find(|r| r.id == id.0) {
            reg.active = false;
        }
    }

    pub fn handler_count(&self, event: Event) -> usize {
        self.handlers.lock().iter().filter(|r| r.active && r.event == event).count()
    }

    /// Fire an event: enqueue one workqueue task per active matching
    /// handler, in registration order.
    pub fn push(&self, event: Event) {
        let guard = self.handlers.lock();
        for reg in guard.iter().filter(|r| r.active && r.event == event) {
            info!(event = %event, "handling event");
            let handler = Arc::clone(&reg.handler);
            self.wq.add(Work::new(event.name(), async move {
                handler(event);
            }));
        }
    }
}

/// Module glue for the event bus.
pub struct EventModule {
    _bus: Arc<EventBus>,
}

impl EventModule {
    pub fn new(bus: Arc<EventBus>) -> Arc<Self> {
        Arc::new(Self { _bus: bus })
    }
}

#[async_trait]
impl Module for EventModule {
    fn name(&self) -> &'static str {
        "event"
    }

    fn deps(&self) -> &'static [&'static str] {
        &["workqueue"]
    }

    async fn init(&self) -> Result<(), ModuleError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
