// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::FakeLedSink;

fn steady(name: &str, priority: LedPriority, key: &str) -> LedCondition {
    LedCondition::steady(name, priority, vec![LedState::new(key, true)])
}

fn fixture() -> (Arc<LedCtl>, Arc<FakeLedSink>) {
    let sink = Arc::new(FakeLedSink::new());
    (LedCtl::new(Arc::clone(&sink) as _), sink)
}

#[tokio::test(start_paused = true)]
async fn highest_priority_condition_drives_the_sinks() {
    let (leds, sink) = fixture();
    leds.add(steady("base", LedPriority::Default, "LED1_path"));
    leds.add(steady("alert", LedPriority::ActionNeeded, "LED2_path"));

    leds.tick(Instant::now());
    assert_eq!(leds.displayed().as_deref(), Some("alert"));
    assert_eq!(sink.last_level("LED2_path"), Some(true));
    // only one condition writes
    assert!(sink.writes.lock().iter().all(|(key, _)| key == "LED2_path"));
}

#[tokio::test(start_paused = true)]
async fn removing_the_winner_falls_back() {
    let (leds, sink) = fixture();
    leds.add(steady("base", LedPriority::Default, "LED1_path"));
    leds.add(steady("alert", LedPriority::Notification, "LED2_path"));

    leds.tick(Instant::now());
    assert_eq!(leds.displayed().as_deref(), Some("alert"));

    leds.remove("alert");
    leds.tick(Instant::now());
    assert_eq!(leds.displayed().as_deref(), Some("base"));
    assert_eq!(sink.last_level("LED1_path"), Some(true));
}

#[tokio::test(start_paused = true)]
async fn ties_resolve_by_insertion_order() {
    let (leds, _sink) = fixture();
    leds.add(steady("first", LedPriority::Notification, "LED1_path"));
    leds.add(steady("second", LedPriority::Notification, "LED2_path"));

    leds.tick(Instant::now());
    assert_eq!(leds.displayed().as_deref(), Some("first"));
}

#[tokio::test(start_paused = true)]
async fn add_replaces_same_name_in_place() {
    let (leds, sink) = fixture();
    leds.add(steady("mode", LedPriority::Mode, "LED1_path"));
    leds.add(steady("mode", LedPriority::Mode, "LED2_path"));

    leds.tick(Instant::now());
    assert_eq!(sink.last_level("LED2_path"), Some(true));
    assert_eq!(sink.last_level("LED1_path"), None);
}

#[tokio::test(start_paused = true)]
async fn blink_toggles_at_interval_boundaries() {
    let (leds, sink) = fixture();
    leds.add(LedCondition::blinking(
        "blinker",
        LedPriority::Notification,
        vec![LedState::new("LED1_path", true)],
        BlinkProgram::forever(Duration::from_millis(100)),
    ));

    let start = Instant::now();
    leds.tick(start);
    assert_eq!(sink.last_level("LED1_path"), Some(true));

    // before the boundary: no new write
    let writes = sink.writes.lock().len();
    leds.tick(start + Duration::from_millis(50));
    assert_eq!(sink.writes.lock().len(), writes);

    leds.tick(start + Duration::from_millis(100));
    assert_eq!(sink.last_level("LED1_path"), Some(false));

    leds.tick(start + Duration::from_millis(200));
    assert_eq!(sink.last_level("LED1_path"), Some(true));
}

#[tokio::test(start_paused = true)]
async fn finite_blink_deactivates_when_exhausted() {
    let (leds, _sink) = fixture();
    leds.add(steady("base", LedPriority::Default, "LED1_path"));
    leds.add(LedCondition::blinking(
        "notice",
        LedPriority::Notification,
        vec![LedState::new("LED2_path", true)],
        BlinkProgram::count(Duration::from_millis(50), 2),
    ));

    let mut now = Instant::now();
    // two toggles plus the exhausted boundary
    for _ in 0..3 {
        leds.tick(now);
        now += Duration::from_millis(50);
    }
    assert!(!leds.is_active("notice"));

    // the fallback takes over
    leds.tick(now);
    assert_eq!(leds.displayed().as_deref(), Some("base"));
}

#[tokio::test(start_paused = true)]
async fn inactive_sink_states_write_low() {
    let (leds, sink) = fixture();
    leds.add(LedCondition::blinking(
        "mixed",
        LedPriority::Notification,
        vec![LedState::new("LED1_path", true), LedState::new("LED2_path", false)],
        BlinkProgram::forever(Duration::from_millis(100)),
    ));

    leds.tick(Instant::now());
    assert_eq!(sink.last_level("LED1_path"), Some(true));
    // an inactive state never rises, even at blink level high
    assert_eq!(sink.last_level("LED2_path"), Some(false));
}

#[tokio::test(start_paused = true)]
async fn empty_mixer_writes_nothing() {
    let (leds, sink) = fixture();
    leds.tick(Instant::now());
    assert!(sink.writes.lock().is_empty());
    assert!(leds.displayed().is_none());
}
