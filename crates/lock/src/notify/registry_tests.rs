// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kvl_store::{MemoryStore, StoreCall};

fn registry(store: &MemoryStore) -> WakeRegistry<MemoryStore> {
    WakeRegistry::new(
        store.clone(),
        TransportConfig::new("wake").with_block_timeout(Duration::from_millis(50)),
    )
    .unwrap()
}

async fn reader_parked(store: &MemoryStore) {
    for _ in 0..200 {
        if store
            .calls()
            .iter()
            .any(|c| matches!(c, StoreCall::ReadBlocking { .. }))
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("reader never started");
}

#[tokio::test]
async fn waiters_are_counted_until_dropped() {
    let registry = registry(&MemoryStore::new());

    let first = registry.register("orders");
    let second = registry.register("orders");
    let _other = registry.register("invoices");
    assert_eq!(registry.waiter_count("orders"), 2);

    drop(first);
    assert_eq!(registry.waiter_count("orders"), 1);
    assert_eq!(second.name(), "orders");
    drop(second);
    assert_eq!(registry.waiter_count("orders"), 0);
    assert_eq!(registry.waiter_count("invoices"), 1);
}

#[tokio::test]
async fn wake_releases_every_waiter_of_the_name() {
    let registry = registry(&MemoryStore::new());
    let first = registry.register("orders");
    let second = registry.register("orders");
    let other = registry.register("invoices");

    assert_eq!(registry.wake("orders"), 2);

    assert!(first.wait(Duration::from_millis(10)).await);
    assert!(second.wait(Duration::from_millis(10)).await);
    assert!(!other.wait(Duration::from_millis(10)).await);
}

#[tokio::test]
async fn wake_without_waiters_is_harmless() {
    let registry = registry(&MemoryStore::new());
    assert_eq!(registry.wake("orders"), 0);
}

#[tokio::test]
async fn wait_times_out_without_wake() {
    let registry = registry(&MemoryStore::new());
    let waiter = registry.register("orders");

    let started = std::time::Instant::now();
    assert!(!waiter.wait(Duration::from_millis(20)).await);
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[tokio::test]
async fn released_wakes_locally_and_emits() {
    let store = MemoryStore::new();
    let registry = registry(&store);
    let waiter = registry.register("orders");

    registry.released("orders").await.unwrap();

    assert!(waiter.wait(Duration::from_millis(10)).await);
    assert_eq!(store.stream_len("wake"), 1);
}

#[tokio::test]
async fn remote_release_wakes_waiters() {
    let store = MemoryStore::new();
    let local = registry(&store);
    let remote = registry(&store);
    local.start().unwrap();
    assert!(local.is_reader_running());
    reader_parked(&store).await;

    let waiter = local.register("orders");
    remote.released("orders").await.unwrap();

    assert!(waiter.wait(Duration::from_secs(2)).await);
}

#[tokio::test]
async fn own_release_is_not_delivered_twice() {
    let store = MemoryStore::new();
    let registry = registry(&store);
    registry.start().unwrap();
    reader_parked(&store).await;

    let waiter = registry.register("orders");
    registry.released("orders").await.unwrap();

    assert!(waiter.wait(Duration::from_millis(10)).await);
    // The stream echo of our own event must not add a second permit
    assert!(!waiter.wait(Duration::from_millis(120)).await);
}

#[tokio::test]
async fn clones_share_waiters_and_reader() {
    let store = MemoryStore::new();
    let registry = registry(&store);
    let clone = registry.clone();

    registry.start().unwrap();
    clone.start().unwrap();
    let _waiter = clone.register("orders");

    assert_eq!(registry.waiter_count("orders"), 1);
    assert!(registry.is_reader_running());

    clone.stop();
    assert!(!registry.is_reader_running());
}

#[tokio::test]
async fn release_right_after_positioning_reaches_waiter() {
    let store = MemoryStore::new();
    let local = registry(&store);
    let remote = registry(&store);
    remote.released("stale").await.unwrap();

    local.start().unwrap();
    local.positioned().await;
    let waiter = local.register("orders");
    remote.released("orders").await.unwrap();

    assert!(waiter.wait(Duration::from_secs(1)).await);
}
