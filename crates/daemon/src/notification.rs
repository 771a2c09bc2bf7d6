// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event→LED notifications: short blink patterns signalling carrier and
//! connectivity changes on the front panel.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nak_core::led::{BlinkProgram, LedCondition, LedPriority, LedState};
use nak_core::Event;
use parking_lot::Mutex;

use crate::event_bus::{EventBus, HandlerId};
use crate::led::LedCtl;
use crate::module::{Module, ModuleError};

const CONNECTIVITY_LOST: &str = "connectivity lost";

fn cable_plugged() -> LedCondition {
    LedCondition::blinking(
        "ethernet plugged",
        LedPriority::Notification,
        vec![LedState::new("LED1_path", true), LedState::new("LED2_path", false)],
        BlinkProgram::count(Duration::from_millis(50), 4),
    )
}

fn cable_removed() -> LedCondition {
    LedCondition::blinking(
        "ethernet removed",
        LedPriority::Notification,
        vec![LedState::new("LED1_path", false), LedState::new("LED2_path", true)],
        BlinkProgram::count(Duration::from_millis(50), 4),
    )
}

fn traffic_blip() -> LedCondition {
    LedCondition::blinking(
        "network traffic",
        LedPriority::Notification,
        vec![LedState::new("LED1_path", false), LedState::new("LED2_path", false)],
        BlinkProgram::count(Duration::from_millis(50), 1),
    )
}

fn connectivity_lost() -> LedCondition {
    LedCondition::blinking(
        CONNECTIVITY_LOST,
        LedPriority::Notification,
        vec![LedState::new("LED1_path", true), LedState::new("LED2_path", true)],
        BlinkProgram::forever(Duration::from_millis(500)),
    )
}

pub struct Notifications {
    events: Arc<EventBus>,
    leds: Arc<LedCtl>,
    handlers: Mutex<Vec<HandlerId>>,
}

impl Notifications {
    pub fn new(events: Arc<EventBus>, leds: Arc<LedCtl>) -> Arc<Self> {
        Arc::new(Self { events, leds, handlers: Mutex::new(Vec::new()) })
    }

    fn subscribe(&self, event: Event, condition: fn() -> LedCondition) -> HandlerId {
        let leds = Arc::clone(&self.leds);
        self.events.add_handler(event, move |_| {
            leds.add(condition());
        })
    }
}

#[async_trait]
impl Module for Notifications {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn deps(&self) -> &'static [&'static str] {
        &["event", "led"]
    }

    async fn init(&self) -> Result<(), ModuleError> {
        let mut handlers = self.handlers.lock();
        handlers.push(self.subscribe(Event::EthWanPlugged, cable_plugged));
        handlers.push(self.subscribe(Event::EthLanPlugged, cable_plugged));
        handlers.push(self.subscribe(Event::EthWanLost, cable_removed));
        handlers.push(self.subscribe(Event::EthLanLost, cable_removed));
        handlers.push(self.subscribe(Event::NetworkTraffic, traffic_blip));
        handlers.push(self.subscribe(Event::ConnectivityLost, connectivity_lost));

        let leds = Arc::clone(&self.leds);
        handlers.push(self.events.add_handler(Event::ConnectivityOk, move |_| {
            leds.remove(CONNECTIVITY_LOST);
        }));
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        for handler in self.handlers.lock().drain(..) {
            self.events.remove_handler(handler);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
