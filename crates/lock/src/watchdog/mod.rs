// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease enforcement
//!
//! A [`Watchdog`] arms one task per acquisition. Unless the holder unlocks
//! first, the task fires `safety_margin` before the lease ends: it interrupts
//! the holder, waits `recovery_delay`, then force-releases the key (still
//! token-checked). A manual unlock at any point before the force release
//! stops the task.

mod schedule;

pub use schedule::{DedicatedScheduler, ExpiryTask, PoolScheduler, ScheduledTask, TaskScheduler};

use crate::base::BaseLock;
use crate::error::LockError;
use crate::interrupt::Interrupt;
use kvl_core::{Clock, WatchdogConfig};
use kvl_store::Store;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lease-expiry engine over a [`TaskScheduler`]
#[derive(Clone)]
pub struct Watchdog<T> {
    scheduler: T,
    config: WatchdogConfig,
}

impl<T: TaskScheduler> Watchdog<T> {
    pub fn new(scheduler: T, config: WatchdogConfig) -> Self {
        Self { scheduler, config }
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    /// Time left before the watchdog must fire, `None` when already due
    pub fn expiry_delay(
        &self,
        lease_moment: Instant,
        lease: Duration,
        now: Instant,
    ) -> Option<Duration> {
        let fire_at = (lease_moment + lease).checked_sub(self.config.safety_margin)?;
        let remaining = fire_at.checked_duration_since(now)?;
        (!remaining.is_zero()).then_some(remaining)
    }

    /// Arm a watchdog for the acquisition `lock` just made
    pub fn arm<S: Store, C: Clock>(
        &self,
        lock: &BaseLock<S, C>,
        owner: Interrupt,
    ) -> Result<WatchdogTask, LockError> {
        let lease = lock
            .lease()
            .ok_or_else(|| LockError::config("watchdog needs a leased lock"))?;
        let now = lock.clock().now();
        let lease_moment = lock.lease_state().lease_moment.unwrap_or(now);

        let delay = match self.expiry_delay(lease_moment, lease, now) {
            Some(delay) => delay,
            None => {
                tracing::error!(
                    lock = lock.name(),
                    lease_ms = lease.as_millis() as u64,
                    fallback_ms = self.config.fallback_delay.as_millis() as u64,
                    "watchdog delay not positive, using fallback"
                );
                self.config.fallback_delay
            }
        };

        let unlocked = Arc::new(AtomicBool::new(false));
        let spent = Arc::new(AtomicBool::new(false));
        let routine = expire(
            lock.clone(),
            owner,
            Arc::clone(&unlocked),
            self.config.recovery_delay,
        );
        let done = Arc::clone(&spent);
        let scheduled = self.scheduler.schedule(
            lock.name(),
            delay,
            Box::pin(async move {
                routine.await;
                done.store(true, Ordering::SeqCst);
            }),
        )?;

        tracing::debug!(
            lock = lock.name(),
            delay_ms = delay.as_millis() as u64,
            "watchdog armed"
        );
        Ok(WatchdogTask {
            unlocked,
            spent,
            scheduled,
        })
    }
}

/// Watchdog for one held lock
pub struct WatchdogTask {
    unlocked: Arc<AtomicBool>,
    spent: Arc<AtomicBool>,
    scheduled: ScheduledTask,
}

impl WatchdogTask {
    /// Whether the expiry routine has run to completion
    pub fn is_spent(&self) -> bool {
        self.spent.load(Ordering::SeqCst)
    }

    /// Mark the lock manually unlocked and cancel the timer
    pub fn disarm(self) {
        self.unlocked.store(true, Ordering::SeqCst);
        self.scheduled.cancel();
    }
}

async fn expire<S: Store, C: Clock>(
    lock: BaseLock<S, C>,
    owner: Interrupt,
    unlocked: Arc<AtomicBool>,
    recovery_delay: Duration,
) {
    if unlocked.load(Ordering::SeqCst) {
        return;
    }

    tracing::warn!(lock = lock.name(), token = %lock.token(), "lease overrun, interrupting holder");
    owner.interrupt();
    tokio::time::sleep(recovery_delay).await;

    if unlocked.load(Ordering::SeqCst) {
        tracing::debug!(lock = lock.name(), "holder unlocked during recovery");
        return;
    }

    match lock.force_release().await {
        Ok(true) => tracing::warn!(lock = lock.name(), "lease overrun, lock force-released"),
        Ok(false) => tracing::debug!(lock = lock.name(), "lock already released"),
        Err(e) => tracing::error!(lock = lock.name(), error = %e, "force release failed"),
    }
}

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
