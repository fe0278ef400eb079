// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lock contract shared by every lock flavour

use crate::error::LockError;
use crate::interrupt::Interrupt;
use async_trait::async_trait;
use std::time::Duration;

/// A named mutex coordinated through a shared store
///
/// Each user builds its own handle; clones of one handle share its token.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    fn name(&self) -> &str;

    /// The handle's cancellation flag
    fn interrupt(&self) -> &Interrupt;

    /// Single acquisition attempt
    async fn try_lock(&self) -> Result<bool, LockError>;

    /// Wait until acquired; interrupts are logged and the wait continues
    async fn lock(&self) -> Result<(), LockError>;

    /// Wait until acquired or interrupted
    async fn lock_interruptibly(&self) -> Result<(), LockError>;

    /// Wait up to `wait` for the lock; interruptible
    async fn try_lock_for(&self, wait: Duration) -> Result<bool, LockError>;

    /// Whether this handle holds the lock, checked against the store
    async fn is_locked(&self) -> Result<bool, LockError>;

    /// Release if held by this handle; a no-op otherwise
    async fn unlock(&self) -> Result<(), LockError>;
}

/// How an acquisition loop treats an interrupt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WaitMode {
    /// Log and keep waiting
    Uninterruptible,
    /// Return [`LockError::Interrupted`]
    Interruptible,
}

impl WaitMode {
    /// Decide what an interrupted wait does next
    pub(crate) fn on_interrupt(self, name: &str) -> Result<(), LockError> {
        match self {
            WaitMode::Uninterruptible => {
                tracing::warn!(lock = name, "interrupted while waiting for lock, retrying");
                Ok(())
            }
            WaitMode::Interruptible => Err(LockError::Interrupted),
        }
    }
}
