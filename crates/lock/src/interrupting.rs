// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leased lock whose lease is enforced by a watchdog
//!
//! Per acquisition: `IDLE -> LOCKED` arms a watchdog. A manual unlock disarms
//! it. Otherwise the watchdog interrupts the holder and force-releases the key
//! shortly before the lease runs out.

use crate::base::{poll_acquire, BaseLock};
use crate::contract::{DistributedLock, WaitMode};
use crate::error::LockError;
use crate::interrupt::Interrupt;
use crate::watchdog::{TaskScheduler, Watchdog, WatchdogTask};
use async_trait::async_trait;
use kvl_core::{Clock, SystemClock, WatchdogConfig};
use kvl_store::Store;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub struct InterruptingLock<S, T, C = SystemClock> {
    base: BaseLock<S, C>,
    watchdog: Watchdog<T>,
    armed: Arc<Mutex<Option<WatchdogTask>>>,
}

impl<S, T: Clone, C> Clone for InterruptingLock<S, T, C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            watchdog: self.watchdog.clone(),
            armed: Arc::clone(&self.armed),
        }
    }
}

impl<S: Store, T: TaskScheduler, C: Clock> InterruptingLock<S, T, C> {
    /// Wrap a leased `base` lock
    ///
    /// The lease must be longer than the watchdog's safety margin.
    pub fn new(
        base: BaseLock<S, C>,
        scheduler: T,
        config: WatchdogConfig,
    ) -> Result<Self, LockError> {
        let Some(lease) = base.lease() else {
            return Err(LockError::config("an interrupting lock needs a lease"));
        };
        if lease <= config.safety_margin {
            return Err(LockError::config(format!(
                "lease {:?} must exceed the safety margin {:?}",
                lease, config.safety_margin
            )));
        }
        Ok(Self {
            base,
            watchdog: Watchdog::new(scheduler, config),
            armed: Arc::new(Mutex::new(None)),
        })
    }

    pub fn base(&self) -> &BaseLock<S, C> {
        &self.base
    }

    fn armed(&self) -> MutexGuard<'_, Option<WatchdogTask>> {
        self.armed.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether a watchdog is currently armed for this handle
    ///
    /// A watchdog that has already enforced the lease no longer counts.
    pub fn is_guarded(&self) -> bool {
        let mut armed = self.armed();
        if armed.as_ref().is_some_and(WatchdogTask::is_spent) {
            *armed = None;
        }
        armed.is_some()
    }

    async fn try_acquire(&self) -> Result<bool, LockError> {
        if !self.base.try_acquire().await? {
            return Ok(false);
        }
        // An interrupt left over from an earlier acquisition is stale
        if self.base.interrupt().clear() {
            tracing::debug!(lock = self.base.name(), "cleared stale interrupt");
        }

        match self.watchdog.arm(&self.base, self.base.interrupt().clone()) {
            Ok(task) => {
                let previous = self.armed().replace(task);
                if let Some(previous) = previous {
                    previous.disarm();
                }
                Ok(true)
            }
            Err(e) => {
                if let Err(release_err) = self.base.release().await {
                    tracing::warn!(
                        lock = self.base.name(),
                        error = %release_err,
                        "release after watchdog failure failed"
                    );
                }
                Err(e)
            }
        }
    }

    async fn acquire(
        &self,
        mode: WaitMode,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<bool, LockError> {
        poll_acquire(
            self.base.name(),
            self.base.interrupt(),
            self.base.retry_interval(),
            mode,
            deadline,
            move || self.try_acquire(),
        )
        .await
    }
}

#[async_trait]
impl<S: Store, T: TaskScheduler, C: Clock> DistributedLock for InterruptingLock<S, T, C> {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn interrupt(&self) -> &Interrupt {
        self.base.interrupt()
    }

    async fn try_lock(&self) -> Result<bool, LockError> {
        self.try_acquire().await
    }

    async fn lock(&self) -> Result<(), LockError> {
        self.acquire(WaitMode::Uninterruptible, None).await.map(|_| ())
    }

    async fn lock_interruptibly(&self) -> Result<(), LockError> {
        self.acquire(WaitMode::Interruptible, None).await.map(|_| ())
    }

    async fn try_lock_for(&self, wait: Duration) -> Result<bool, LockError> {
        let deadline = tokio::time::Instant::now() + wait;
        self.acquire(WaitMode::Interruptible, Some(deadline)).await
    }

    async fn is_locked(&self) -> Result<bool, LockError> {
        self.base.is_locked().await
    }

    async fn unlock(&self) -> Result<(), LockError> {
        let task = self.armed().take();
        if let Some(task) = task {
            task.disarm();
        }
        self.base.release().await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "interrupting_tests.rs"]
mod tests;
