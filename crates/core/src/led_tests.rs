// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

fn cond(name: &str, priority: LedPriority) -> LedCondition {
    LedCondition::steady(name, priority, vec![LedState::new("LED1_path", true)])
}

#[test]
fn highest_priority_wins() {
    let conditions = vec![
        cond("default", LedPriority::Default),
        cond("alert", LedPriority::ActionNeeded),
        cond("mode", LedPriority::Mode),
    ];
    assert_eq!(choose_condition(&conditions), Some(1));
}

#[test]
fn ties_break_by_insertion_order() {
    let conditions = vec![
        cond("first", LedPriority::Notification),
        cond("second", LedPriority::Notification),
    ];
    assert_eq!(choose_condition(&conditions), Some(0));
}

#[test]
fn inactive_conditions_are_skipped() {
    let mut high = cond("high", LedPriority::ActionNeeded);
    high.active = false;
    let conditions = vec![high, cond("low", LedPriority::Default)];
    assert_eq!(choose_condition(&conditions), Some(1));
}

#[test]
fn empty_set_selects_nothing() {
    assert_eq!(choose_condition(&[]), None);
}

#[test]
fn blink_step_toggles_and_counts_down() {
    let mut blink = BlinkProgram::count(Duration::from_millis(50), 2);
    assert_eq!(blink.step(), Some(true));
    assert_eq!(blink.remaining, 1);
    assert_eq!(blink.step(), Some(false));
    assert_eq!(blink.remaining, 0);
    // exhausted: no further levels
    assert_eq!(blink.step(), None);
    assert_eq!(blink.step(), None);
}

#[test]
fn infinite_blink_never_exhausts() {
    let mut blink = BlinkProgram::forever(Duration::from_millis(100));
    let mut expected = true;
    for _ in 0..1000 {
        assert_eq!(blink.step(), Some(expected));
        expected = !expected;
    }
    assert_eq!(blink.remaining, -1);
}
