// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run a task while holding a lock

use crate::contract::DistributedLock;
use crate::error::LockError;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;

/// Acquire with `lock()`, run `task`, then release
///
/// If the handle is interrupted while `task` runs (for example by a lease
/// watchdog) the task is dropped, the lock released and
/// [`LockError::Interrupted`] returned.
pub async fn under_lock<L, F, Fut, T>(lock: &L, task: F) -> Result<T, LockError>
where
    L: DistributedLock + Clone + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    lock.lock().await?;
    run_held(lock, task).await
}

/// Like [`under_lock`], waiting at most `wait` for the lock
///
/// Returns `None` when the lock was not obtained in time.
pub async fn try_under_lock<L, F, Fut, T>(
    lock: &L,
    wait: Duration,
    task: F,
) -> Result<Option<T>, LockError>
where
    L: DistributedLock + Clone + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    if !lock.try_lock_for(wait).await? {
        return Ok(None);
    }
    run_held(lock, task).await.map(Some)
}

async fn run_held<L, F, Fut, T>(lock: &L, task: F) -> Result<T, LockError>
where
    L: DistributedLock + Clone + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    let mut guard = ReleaseOnDrop {
        lock: Some(lock.clone()),
    };
    let outcome = lock.interrupt().guard(task()).await;
    guard.disarm();

    let released = lock.unlock().await;
    let value = outcome?;
    released?;
    Ok(value)
}

/// Releases the lock from a spawned task if the holder is dropped mid-flight
struct ReleaseOnDrop<L: DistributedLock + Clone + 'static> {
    lock: Option<L>,
}

impl<L: DistributedLock + Clone + 'static> ReleaseOnDrop<L> {
    fn disarm(&mut self) {
        self.lock = None;
    }
}

impl<L: DistributedLock + Clone + 'static> Drop for ReleaseOnDrop<L> {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = lock.unlock().await {
                        tracing::warn!(lock = lock.name(), error = %e, "deferred unlock failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(lock = lock.name(), "no runtime to release abandoned lock");
            }
        }
    }
}

#[cfg(test)]
#[path = "scoped_tests.rs"]
mod tests;
