// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kvl_core::SequentialTokenGen;
use kvl_store::MemoryStore;
use tokio::runtime::Runtime;

fn blocking(
    runtime: &Runtime,
    store: &MemoryStore,
    tokens: &SequentialTokenGen,
) -> BlockingLock<MemoryStore> {
    BaseLock::builder(store.clone(), "orders")
        .token_gen(tokens)
        .retry_interval(Duration::from_millis(5))
        .build()
        .unwrap()
        .into_blocking_with(runtime.handle().clone())
        .unwrap()
}

#[test]
fn blocking_lock_excludes_other_handles() {
    let runtime = Runtime::new().unwrap();
    let store = MemoryStore::new();
    let tokens = SequentialTokenGen::default();
    let first = blocking(&runtime, &store, &tokens);
    let second = blocking(&runtime, &store, &tokens);

    assert!(first.try_lock().unwrap());
    assert!(first.is_locked().unwrap());
    assert!(!second.try_lock().unwrap());
    assert!(!second.try_lock_for(Duration::from_millis(20)).unwrap());

    first.unlock().unwrap();
    second.lock().unwrap();
    assert!(second.is_locked().unwrap());
}

#[test]
fn with_releases_after_task() {
    let runtime = Runtime::new().unwrap();
    let store = MemoryStore::new();
    let lock = blocking(&runtime, &store, &SequentialTokenGen::default());

    let held = lock.with(|| store.peek("orders")).unwrap();

    assert_eq!(held.as_deref(), Some("token-orders-1"));
    assert_eq!(store.peek("orders"), None);
}

#[test]
fn with_releases_when_task_panics() {
    let runtime = Runtime::new().unwrap();
    let store = MemoryStore::new();
    let lock = blocking(&runtime, &store, &SequentialTokenGen::default());

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        lock.with(|| panic!("task failed")).unwrap();
    }));

    assert!(outcome.is_err());
    assert_eq!(store.peek("orders"), None);
}

#[test]
fn into_inner_returns_the_async_handle() {
    let runtime = Runtime::new().unwrap();
    let store = MemoryStore::new();
    let lock = blocking(&runtime, &store, &SequentialTokenGen::default());

    lock.lock().unwrap();
    let inner = lock.into_inner();
    assert!(runtime.block_on(inner.is_locked()).unwrap());
}
