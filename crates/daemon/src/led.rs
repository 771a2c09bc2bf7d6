// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LED condition mixer.
//!
//! Holds the set of named conditions and drives the sinks from a fast
//! tick: exactly one condition (the active one of highest priority) is
//! displayed at any instant. Blink programs advance at their own interval
//! boundaries; a finished program deactivates its condition.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nak_core::led::{choose_condition, BlinkProgram, LedCondition, LedPriority, LedState};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::adapters::LedSink;
use crate::module::{Module, ModuleError};
use crate::timer::{TimerHandle, TimerService};
use crate::workqueue::{Work, Workqueue};

pub const TICK_INTERVAL: Duration = Duration::from_millis(33);
const TICK_TASK: &str = "led update";

struct MixerState {
    conditions: Vec<LedCondition>,
    displayed: Option<String>,
    next_toggle: Option<Instant>,
}

pub struct LedCtl {
    sink: Arc<dyn LedSink>,
    state: Mutex<MixerState>,
}

impl LedCtl {
    pub fn new(sink: Arc<dyn LedSink>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            state: Mutex::new(MixerState {
                conditions: Vec::new(),
                displayed: None,
                next_toggle: None,
            }),
        })
    }

    /// Insert a condition, replacing a same-named one in place (its
    /// insertion rank is preserved).
    pub fn add(&self, condition: LedCondition) {
        let mut state = self.state.lock();
        match state.conditions.iter_mut().find(|c| c.name == condition.name) {
            Some(slot) => *slot = condition,
            None => state.conditions.push(condition),
        }
    }

    pub fn remove(&self, name: &str) {
        debug!(condition = name, "removing LED condition");
        let mut state = self.state.lock();
        state.conditions.retain(|c| c.name != name);
        if state.displayed.as_deref() == Some(name) {
            state.displayed = None;
        }
    }

    pub fn displayed(&self) -> Option<String> {
        self.state.lock().displayed.clone()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.state.lock().conditions.iter().any(|c| c.active && c.name == name)
    }

    /// One mixer tick: select the winner, swap if it changed, advance its
    /// blink program at interval boundaries.
    pub fn tick(&self, now: Instant) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let Some(idx) = choose_condition(&state.conditions) else {
            return;
        };

        let name = state.conditions[idx].name.clone();
        if state.displayed.as_deref() != Some(name.as_str()) {
            debug!(condition = %name, "next LED condition");
            state.displayed = Some(name);
            state.next_toggle = None;
        }

        let due = state.next_toggle.map_or(true, |at| now >= at);
        let condition = &mut state.conditions[idx];
        match condition.blink.as_mut() {
            None => {
                for led in &condition.states {
                    self.sink.set(&led.sink_key, led.active);
                }
            }
            Some(blink) => {
                if !due {
                    return;
                }
                let interval = blink.interval;
                match blink.step() {
                    Some(level) => {
                        for led in &condition.states {
                            self.sink.set(&led.sink_key, led.active && level);
                        }
                        state.next_toggle = Some(now + interval);
                    }
                    None => {
                        condition.active = false;
                        state.displayed = None;
                        state.next_toggle = None;
                    }
                }
            }
        }
    }
}

/// The always-on fallback shown when nothing else is active.
pub fn default_condition() -> LedCondition {
    LedCondition::blinking(
        "default",
        LedPriority::Default,
        vec![LedState::new("LED1_path", true), LedState::new("LED2_path", true)],
        BlinkProgram::forever(Duration::from_millis(100)),
    )
}

/// Module glue: the mixer tick, coalesced through the workqueue.
pub struct LedModule {
    leds: Arc<LedCtl>,
    timers: Arc<TimerService>,
    wq: Arc<Workqueue>,
    timer: Mutex<Option<TimerHandle>>,
}

impl LedModule {
    pub fn new(leds: Arc<LedCtl>, timers: Arc<TimerService>, wq: Arc<Workqueue>) -> Arc<Self> {
        Arc::new(Self { leds, timers, wq, timer: Mutex::new(None) })
    }
}

#[async_trait]
impl Module for LedModule {
    fn name(&self) -> &'static str {
        "led"
    }

    fn deps(&self) -> &'static [&'static str] {
        &["timer", "workqueue"]
    }

    async fn init(&self) -> Result<(), ModuleError> {
        self.leds.add(default_condition());
        let leds = Arc::clone(&self.leds);
        let wq = Arc::clone(&self.wq);
        let handle = self.timers.add("led tick", TICK_INTERVAL, move || {
            if wq.pending(TICK_TASK) {
                return;
            }
            let leds = Arc::clone(&leds);
            wq.add(Work::new(TICK_TASK, async move {
                leds.tick(Instant::now());
            }));
        });
        *self.timer.lock() = Some(handle);
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ModuleError> {
        if let Some(handle) = self.timer.lock().take() {
            self.timers.remove(handle);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "led_tests.rs"]
mod tests;
