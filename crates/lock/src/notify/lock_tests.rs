// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kvl_core::{SequentialTokenGen, TransportConfig};
use kvl_store::{MemoryStore, StoreCall};

fn registry(store: &MemoryStore) -> WakeRegistry<MemoryStore> {
    WakeRegistry::new(
        store.clone(),
        TransportConfig::new("wake").with_block_timeout(Duration::from_millis(50)),
    )
    .unwrap()
}

fn notifying(
    store: &MemoryStore,
    registry: &WakeRegistry<MemoryStore>,
    tokens: &SequentialTokenGen,
    fallback: Duration,
) -> NotificationLock<MemoryStore> {
    let base = BaseLock::builder(store.clone(), "orders")
        .token_gen(tokens)
        .build()
        .unwrap();
    NotificationLock::new(
        base,
        registry.clone(),
        &LockConfig::default().with_wake_fallback(fallback),
    )
    .unwrap()
}

async fn parked(store: &MemoryStore, registry: &WakeRegistry<MemoryStore>) {
    for _ in 0..200 {
        let reading = store
            .calls()
            .iter()
            .any(|c| matches!(c, StoreCall::ReadBlocking { .. }));
        if reading && registry.waiter_count("orders") > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("waiter never parked");
}

#[tokio::test]
async fn new_rejects_zero_fallback() {
    let store = MemoryStore::new();
    let base = BaseLock::builder(store.clone(), "orders").build().unwrap();
    let err = NotificationLock::new(
        base,
        registry(&store),
        &LockConfig::default().with_wake_fallback(Duration::ZERO),
    )
    .err()
    .unwrap();
    assert!(matches!(err, LockError::Config(_)));
}

#[tokio::test]
async fn unlock_emits_only_after_deleting() {
    let store = MemoryStore::new();
    let wake = registry(&store);
    let tokens = SequentialTokenGen::default();
    let holder = notifying(&store, &wake, &tokens, Duration::from_secs(5));
    let other = notifying(&store, &wake, &tokens, Duration::from_secs(5));

    assert!(holder.try_lock().await.unwrap());
    other.unlock().await.unwrap();
    assert_eq!(store.stream_len("wake"), 0);

    holder.unlock().await.unwrap();
    assert_eq!(store.stream_len("wake"), 1);

    holder.unlock().await.unwrap();
    assert_eq!(store.stream_len("wake"), 1);
}

#[tokio::test]
async fn remote_release_wakes_blocked_lock() {
    let store = MemoryStore::new();
    let tokens = SequentialTokenGen::default();
    let holder = notifying(&store, &registry(&store), &tokens, Duration::from_secs(5));
    let waiting_registry = registry(&store);
    let waiter = notifying(&store, &waiting_registry, &tokens, Duration::from_secs(5));

    assert!(holder.try_lock().await.unwrap());
    let task = tokio::spawn({
        let waiter = waiter.clone();
        async move { waiter.lock().await }
    });
    parked(&store, &waiting_registry).await;

    let released = std::time::Instant::now();
    holder.unlock().await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(released.elapsed() < Duration::from_secs(2));
    assert!(waiter.is_locked().await.unwrap());
    assert_eq!(waiting_registry.waiter_count("orders"), 0);
}

#[tokio::test]
async fn local_release_wakes_waiter_in_same_registry() {
    let store = MemoryStore::new();
    let wake = registry(&store);
    let tokens = SequentialTokenGen::default();
    let holder = notifying(&store, &wake, &tokens, Duration::from_secs(5));
    let waiter = notifying(&store, &wake, &tokens, Duration::from_secs(5));

    assert!(holder.try_lock().await.unwrap());
    let task = tokio::spawn({
        let waiter = waiter.clone();
        async move { waiter.try_lock_for(Duration::from_secs(3)).await }
    });
    parked(&store, &wake).await;

    holder.unlock().await.unwrap();
    let acquired = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(acquired);
}

#[tokio::test]
async fn fallback_covers_store_expiry() {
    let store = MemoryStore::new();
    let wake = registry(&store);
    let tokens = SequentialTokenGen::default();
    let expiring = BaseLock::builder(store.clone(), "orders")
        .lease(Duration::from_millis(40))
        .token_gen(&tokens)
        .build()
        .unwrap();
    let waiter = notifying(&store, &wake, &tokens, Duration::from_millis(20));

    assert!(expiring.try_lock().await.unwrap());
    assert!(waiter.try_lock_for(Duration::from_secs(2)).await.unwrap());
    assert_eq!(store.stream_len("wake"), 0);
}

#[tokio::test]
async fn try_lock_for_times_out() {
    let store = MemoryStore::new();
    let wake = registry(&store);
    let tokens = SequentialTokenGen::default();
    let holder = notifying(&store, &wake, &tokens, Duration::from_secs(5));
    let waiter = notifying(&store, &wake, &tokens, Duration::from_secs(5));

    assert!(holder.try_lock().await.unwrap());
    let started = std::time::Instant::now();
    assert!(!waiter.try_lock_for(Duration::from_millis(50)).await.unwrap());

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_secs(2));
    assert_eq!(wake.waiter_count("orders"), 0);
}

#[tokio::test]
async fn lock_interruptibly_propagates_interrupt() {
    let store = MemoryStore::new();
    let wake = registry(&store);
    let tokens = SequentialTokenGen::default();
    let holder = notifying(&store, &wake, &tokens, Duration::from_secs(5));
    let waiter = notifying(&store, &wake, &tokens, Duration::from_secs(5));
    assert!(holder.try_lock().await.unwrap());

    let task = tokio::spawn({
        let waiter = waiter.clone();
        async move { waiter.lock_interruptibly().await }
    });
    parked(&store, &wake).await;
    waiter.interrupt().interrupt();

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_interrupted());
    assert_eq!(wake.waiter_count("orders"), 0);
}

#[tokio::test]
async fn lock_rides_out_interrupts() {
    let store = MemoryStore::new();
    let wake = registry(&store);
    let tokens = SequentialTokenGen::default();
    let holder = notifying(&store, &wake, &tokens, Duration::from_secs(5));
    let waiter = notifying(&store, &wake, &tokens, Duration::from_secs(5));
    assert!(holder.try_lock().await.unwrap());

    let task = tokio::spawn({
        let waiter = waiter.clone();
        async move { waiter.lock().await }
    });
    parked(&store, &wake).await;
    waiter.interrupt().interrupt();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!task.is_finished());

    holder.unlock().await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
