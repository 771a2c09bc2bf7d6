// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::FakeLedSink;
use crate::workqueue::{Work, Workqueue};

struct Fixture {
    wq: Arc<Workqueue>,
    events: Arc<EventBus>,
    leds: Arc<LedCtl>,
    notifications: Arc<Notifications>,
}

async fn fixture() -> Fixture {
    let wq = Workqueue::new(2);
    wq.spawn_workers();
    let events = EventBus::new(Arc::clone(&wq));
    let leds = LedCtl::new(Arc::new(FakeLedSink::new()) as _);
    let notifications = Notifications::new(Arc::clone(&events), Arc::clone(&leds));
    notifications.init().await.unwrap();
    Fixture { wq, events, leds, notifications }
}

async fn fence(wq: &Arc<Workqueue>) {
    wq.add_sync(Work::new("fence", async {})).await;
}

#[tokio::test(start_paused = true)]
async fn cable_events_raise_notification_conditions() {
    let f = fixture().await;
    f.events.push(Event::EthWanPlugged);
    fence(&f.wq).await;
    assert!(f.leds.is_active("ethernet plugged"));

    f.events.push(Event::EthLanLost);
    fence(&f.wq).await;
    assert!(f.leds.is_active("ethernet removed"));
    f.wq.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn connectivity_lost_sticks_until_recovery() {
    let f = fixture().await;
    f.events.push(Event::ConnectivityLost);
    fence(&f.wq).await;
    assert!(f.leds.is_active("connectivity lost"));

    f.events.push(Event::ConnectivityOk);
    fence(&f.wq).await;
    assert!(!f.leds.is_active("connectivity lost"));
    f.wq.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn cleanup_unsubscribes_all_handlers() {
    let f = fixture().await;
    f.notifications.cleanup().await.unwrap();

    f.events.push(Event::EthWanPlugged);
    fence(&f.wq).await;
    assert!(!f.leds.is_active("ethernet plugged"));
    f.wq.shutdown().await;
}
