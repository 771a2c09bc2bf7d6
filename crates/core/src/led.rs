// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LED condition types and selection logic.
//!
//! A condition is a named, priority-ranked program driving a set of LED
//! sinks, optionally with a blink pattern. The mixer displays exactly one
//! condition at a time: the active one of highest priority, ties broken by
//! insertion order.

use std::time::Duration;

/// Priority classes, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LedPriority {
    Default,
    Mode,
    Notification,
    ActionNeeded,
}

/// Target level for a single sink while the owning condition is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedState {
    /// Config key resolving to the sink path (`nakd.leds.<key>`).
    pub sink_key: String,
    /// Level this sink holds while the condition's blink level is high.
    pub active: bool,
}

impl LedState {
    pub fn new(sink_key: impl Into<String>, active: bool) -> Self {
        Self { sink_key: sink_key.into(), active }
    }
}

/// Blink pattern state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlinkProgram {
    pub interval: Duration,
    /// Toggles remaining; negative means blink forever.
    pub remaining: i32,
    /// Current output level; flipped at each interval boundary.
    pub level: bool,
}

impl BlinkProgram {
    pub fn forever(interval: Duration) -> Self {
        Self { interval, remaining: -1, level: true }
    }

    pub fn count(interval: Duration, count: i32) -> Self {
        Self { interval, remaining: count, level: true }
    }

    /// One interval boundary: returns the level to display now, toggling
    /// for the next boundary, or `None` once the program is exhausted and
    /// the owning condition should deactivate.
    pub fn step(&mut self) -> Option<bool> {
        if self.remaining == 0 {
            return None;
        }
        let level = self.level;
        self.level = !self.level;
        if self.remaining > 0 {
            self.remaining -= 1;
        }
        Some(level)
    }
}

/// A named LED program.
#[derive(Debug, Clone)]
pub struct LedCondition {
    pub name: String,
    pub priority: LedPriority,
    pub states: Vec<LedState>,
    pub blink: Option<BlinkProgram>,
    pub active: bool,
}

impl LedCondition {
    pub fn steady(name: impl Into<String>, priority: LedPriority, states: Vec<LedState>) -> Self {
        Self { name: name.into(), priority, states, blink: None, active: true }
    }

    pub fn blinking(
        name: impl Into<String>,
        priority: LedPriority,
        states: Vec<LedState>,
        blink: BlinkProgram,
    ) -> Self {
        Self { name: name.into(), priority, states, blink: Some(blink), active: true }
    }
}

/// Pick the condition to display: active, maximum priority, first inserted
/// among equals.
pub fn choose_condition(conditions: &[LedCondition]) -> Option<usize> {
    let mut winner: Option<usize> = None;
    for (idx, cond) in conditions.iter().enumerate() {
        if !cond.active {
            continue;
        }
        match winner {
            Some(best) if conditions[best].priority >= cond.priority => {}
            _ => winner = Some(idx),
        }
    }
    winner
}

#[cfg(test)]
#[path = "led_tests.rs"]
mod tests;
