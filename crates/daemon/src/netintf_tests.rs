// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::{FakeNetStatus, MemConfig};
use nak_core::Event;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

struct Fixture {
    wq: Arc<Workqueue>,
    netintf: Arc<Netintf>,
    provider: Arc<FakeNetStatus>,
    events: Arc<EventBus>,
}

fn fixture() -> Fixture {
    let wq = Workqueue::new(2);
    wq.spawn_workers();
    let events = EventBus::new(Arc::clone(&wq));
    let provider = Arc::new(FakeNetStatus::new());
    let config = Arc::new(
        MemConfig::new()
            .with("nakd", "interfaces", "wan", "eth0".into())
            .with("nakd", "interfaces", "lan", "eth1".into()),
    );
    let netintf = Netintf::new(
        Arc::clone(&provider) as _,
        config as _,
        Arc::clone(&events),
    );
    Fixture { wq, netintf, provider, events }
}

async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test(start_paused = true)]
async fn rising_wan_carrier_delivers_one_event() {
    let f = fixture();
    let plugged = Arc::new(AtomicUsize::new(0));
    {
        let plugged = Arc::clone(&plugged);
        f.events.add_handler(Event::EthWanPlugged, move |_| {
            plugged.fetch_add(1, Ordering::SeqCst);
        });
    }

    f.provider.set(serde_json::json!({"eth0": {"carrier": false}}));
    f.netintf.poll().await;
    f.provider.set(serde_json::json!({"eth0": {"carrier": true}}));
    f.netintf.poll().await;
    wait_until(|| plugged.load(Ordering::SeqCst) == 1).await;

    // a third identical poll delivers no further event
    f.netintf.poll().await;
    f.wq.add_sync(Work::new("fence", async {})).await;
    assert_eq!(plugged.load(Ordering::SeqCst), 1);
    f.wq.shutdown().await;
}

#[tokio::test]
async fn unknown_state_produces_no_snapshot() {
    let f = fixture();
    f.netintf.poll().await;
    assert!(!f.netintf.state_known());
    assert_eq!(f.netintf.carrier(InterfaceRole::Wan), None);
    f.wq.shutdown().await;
}

#[tokio::test]
async fn carrier_and_status_resolve_through_roles() {
    let f = fixture();
    f.provider.set(serde_json::json!({
        "eth0": {"carrier": true, "speed": "1000F"},
        "eth1": {"carrier": false},
    }));
    f.netintf.poll().await;

    assert_eq!(f.netintf.carrier(InterfaceRole::Wan), Some(true));
    assert_eq!(f.netintf.carrier(InterfaceRole::Lan), Some(false));
    // unbound role
    assert_eq!(f.netintf.carrier(InterfaceRole::Wlan), None);

    assert_eq!(f.netintf.status_of(InterfaceRole::Wan)["speed"], "1000F");
    assert_eq!(f.netintf.status_of(InterfaceRole::Ap), serde_json::Value::Null);
    f.wq.shutdown().await;
}

#[tokio::test]
async fn paused_updates_skip_polls() {
    let f = fixture();
    f.provider.set(serde_json::json!({"eth0": {"carrier": true}}));

    f.netintf.pause_updates();
    f.netintf.poll().await;
    assert!(!f.netintf.state_known());

    f.netintf.resume_updates();
    f.netintf.poll().await;
    assert!(f.netintf.state_known());
    f.wq.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn same_tick_flap_collapses() {
    let f = fixture();
    let fired = Arc::new(AtomicUsize::new(0));
    {
        let fired = Arc::clone(&fired);
        f.events.add_handler(Event::EthWanPlugged, move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let fired = Arc::clone(&fired);
        f.events.add_handler(Event::EthWanLost, move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        });
    }

    // carrier true in both adjacent snapshots: the flap in between was
    // never observed, so no edge fires
    f.provider.set(serde_json::json!({"eth0": {"carrier": true}}));
    f.netintf.poll().await;
    f.netintf.poll().await;
    f.wq.add_sync(Work::new("fence", async {})).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    f.wq.shutdown().await;
}
