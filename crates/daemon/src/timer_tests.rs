// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Give spawned timer tasks a chance to observe advanced time.
async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn timer_fires_periodically() {
    let timers = TimerService::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let handle = timers.add("test", Duration::from_millis(100), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // nothing before the first full interval
    tokio::time::advance(Duration::from_millis(50)).await;
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    for _ in 0..3 {
        tokio::time::advance(Duration::from_millis(100)).await;
        settle().await;
    }
    assert_eq!(fired.load(Ordering::SeqCst), 3);

    timers.remove(handle);
}

#[tokio::test(start_paused = true)]
async fn removed_timer_stops_firing() {
    let timers = TimerService::new();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let handle = timers.add("test", Duration::from_millis(100), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::advance(Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    timers.remove(handle);
    assert_eq!(timers.active_count(), 0);

    tokio::time::advance(Duration::from_millis(500)).await;
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn remove_all_deactivates_everything() {
    let timers = TimerService::new();
    let fired = Arc::new(AtomicUsize::new(0));
    for name in ["a", "b", "c"] {
        let counter = Arc::clone(&fired);
        timers.add(name, Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert_eq!(timers.active_count(), 3);

    timers.remove_all();
    tokio::time::advance(Duration::from_millis(300)).await;
    settle().await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn independent_intervals_tick_independently() {
    let timers = TimerService::new();
    let fast = Arc::new(AtomicUsize::new(0));
    let slow = Arc::new(AtomicUsize::new(0));
    {
        let fast = Arc::clone(&fast);
        timers.add("fast", Duration::from_millis(10), move || {
            fast.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let slow = Arc::clone(&slow);
        timers.add("slow", Duration::from_millis(100), move || {
            slow.fetch_add(1, Ordering::SeqCst);
        });
    }

    for _ in 0..10 {
        tokio::time::advance(Duration::from_millis(10)).await;
        settle().await;
    }
    assert_eq!(fast.load(Ordering::SeqCst), 10);
    assert_eq!(slow.load(Ordering::SeqCst), 1);
}
