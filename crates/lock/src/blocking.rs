// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous adapter for callers outside async code
//!
//! Every call blocks on the runtime handle, so it must not be made from a
//! runtime worker thread.

use crate::base::BaseLock;
use crate::contract::DistributedLock;
use crate::error::LockError;
use kvl_core::{Clock, SystemClock};
use kvl_store::Store;
use std::time::Duration;
use tokio::runtime::Handle;

/// A lease-free [`BaseLock`] driven from synchronous code
pub struct BlockingLock<S, C = SystemClock> {
    lock: BaseLock<S, C>,
    handle: Handle,
}

impl<S: Store, C: Clock> BlockingLock<S, C> {
    pub(crate) fn new(lock: BaseLock<S, C>, handle: Handle) -> Self {
        Self { lock, handle }
    }

    pub fn name(&self) -> &str {
        self.lock.name()
    }

    pub fn try_lock(&self) -> Result<bool, LockError> {
        self.handle.block_on(self.lock.try_lock())
    }

    pub fn lock(&self) -> Result<(), LockError> {
        self.handle.block_on(self.lock.lock())
    }

    pub fn try_lock_for(&self, wait: Duration) -> Result<bool, LockError> {
        self.handle.block_on(self.lock.try_lock_for(wait))
    }

    pub fn is_locked(&self) -> Result<bool, LockError> {
        self.handle.block_on(self.lock.is_locked())
    }

    pub fn unlock(&self) -> Result<(), LockError> {
        self.handle.block_on(self.lock.unlock())
    }

    /// Run `task` while holding the lock, releasing it even if `task` panics
    pub fn with<T>(&self, task: impl FnOnce() -> T) -> Result<T, LockError> {
        self.lock()?;
        let mut guard = UnlockOnDrop {
            lock: self,
            armed: true,
        };
        let value = task();
        guard.armed = false;
        self.unlock()?;
        Ok(value)
    }

    pub fn into_inner(self) -> BaseLock<S, C> {
        self.lock
    }
}

struct UnlockOnDrop<'a, S: Store, C: Clock> {
    lock: &'a BlockingLock<S, C>,
    armed: bool,
}

impl<S: Store, C: Clock> Drop for UnlockOnDrop<'_, S, C> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = self.lock.unlock() {
                tracing::warn!(lock = self.lock.name(), error = %e, "unlock after panic failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "blocking_tests.rs"]
mod tests;
