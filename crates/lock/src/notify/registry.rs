// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routes wake events to the handles waiting on each lock name

use super::transport::StreamTransport;
use crate::error::LockError;
use kvl_core::{Clock, SystemClock, TransportConfig};
use kvl_store::Store;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Default)]
struct WaiterTable {
    entries: Mutex<HashMap<String, Vec<(u64, Arc<Semaphore>)>>>,
    next_id: AtomicU64,
}

impl WaiterTable {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Vec<(u64, Arc<Semaphore>)>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, name: &str) -> (u64, Arc<Semaphore>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let permits = Arc::new(Semaphore::new(0));
        self.entries()
            .entry(name.to_string())
            .or_default()
            .push((id, Arc::clone(&permits)));
        (id, permits)
    }

    fn remove(&self, name: &str, id: u64) {
        let mut entries = self.entries();
        if let Some(waiters) = entries.get_mut(name) {
            waiters.retain(|(waiter, _)| *waiter != id);
            if waiters.is_empty() {
                entries.remove(name);
            }
        }
    }

    fn wake(&self, name: &str) -> usize {
        let entries = self.entries();
        let Some(waiters) = entries.get(name) else {
            return 0;
        };
        for (_, permits) in waiters {
            permits.add_permits(1);
        }
        waiters.len()
    }

    fn count(&self, name: &str) -> usize {
        self.entries().get(name).map_or(0, Vec::len)
    }
}

/// A registered interest in one lock name
///
/// Dropping the waiter removes it from the registry.
pub struct Waiter {
    name: String,
    id: u64,
    permits: Arc<Semaphore>,
    table: Arc<WaiterTable>,
}

impl Waiter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Park until woken or `timeout` elapses; `true` when woken
    pub async fn wait(&self, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, self.permits.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                true
            }
            Ok(Err(_)) | Err(_) => false,
        }
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.table.remove(&self.name, self.id);
    }
}

struct RegistryInner<S, C> {
    transport: StreamTransport<S, C>,
    waiters: Arc<WaiterTable>,
}

/// Wake registry owning one stream transport
///
/// Clones share the transport and the waiter table. The reader is aborted
/// when the last clone is dropped.
pub struct WakeRegistry<S, C = SystemClock> {
    inner: Arc<RegistryInner<S, C>>,
}

impl<S, C> Clone for WakeRegistry<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Store> WakeRegistry<S> {
    pub fn new(store: S, config: TransportConfig) -> Result<Self, LockError> {
        Self::with_clock(store, SystemClock, config)
    }
}

impl<S: Store, C: Clock> WakeRegistry<S, C> {
    pub fn with_clock(store: S, clock: C, config: TransportConfig) -> Result<Self, LockError> {
        Ok(Self {
            inner: Arc::new(RegistryInner {
                transport: StreamTransport::new(store, clock, config)?,
                waiters: Arc::new(WaiterTable::default()),
            }),
        })
    }

    /// Start the stream reader; a no-op once started
    pub fn start(&self) -> Result<(), LockError> {
        let waiters = Arc::clone(&self.inner.waiters);
        self.inner.transport.start(move |envelope| {
            let woken = waiters.wake(&envelope.message);
            tracing::trace!(lock = %envelope.message, woken, "remote release");
        })?;
        Ok(())
    }

    /// Wait until the reader has pinned its starting point in the stream
    pub async fn positioned(&self) {
        self.inner.transport.positioned().await;
    }

    pub fn register(&self, name: &str) -> Waiter {
        let (id, permits) = self.inner.waiters.insert(name);
        Waiter {
            name: name.to_string(),
            id,
            permits,
            table: Arc::clone(&self.inner.waiters),
        }
    }

    /// Wake every local waiter of `name`, returning how many there were
    pub fn wake(&self, name: &str) -> usize {
        self.inner.waiters.wake(name)
    }

    /// This process deleted `name`'s key: wake local waiters and tell the others
    pub async fn released(&self, name: &str) -> Result<(), LockError> {
        let woken = self.wake(name);
        tracing::debug!(lock = name, woken, "local release");
        self.inner.transport.emit(name).await?;
        Ok(())
    }

    pub fn waiter_count(&self, name: &str) -> usize {
        self.inner.waiters.count(name)
    }

    pub fn is_reader_running(&self) -> bool {
        self.inner.transport.is_running()
    }

    pub fn stop(&self) {
        self.inner.transport.stop();
    }

    pub fn transport(&self) -> &StreamTransport<S, C> {
        &self.inner.transport
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
