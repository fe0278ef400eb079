// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock that parks on wake events instead of polling
//!
//! The store CAS stays authoritative: a wake only triggers another attempt.
//! Keys that vanish by store expiry emit no event, so every park is bounded
//! by `wake_fallback`.

use super::registry::WakeRegistry;
use crate::base::BaseLock;
use crate::contract::{DistributedLock, WaitMode};
use crate::error::LockError;
use crate::interrupt::Interrupt;
use async_trait::async_trait;
use kvl_core::{Clock, LockConfig, SystemClock};
use kvl_store::Store;
use std::time::Duration;

pub struct NotificationLock<S, C = SystemClock> {
    base: BaseLock<S, C>,
    registry: WakeRegistry<S>,
    wake_fallback: Duration,
}

impl<S, C> Clone for NotificationLock<S, C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            registry: self.registry.clone(),
            wake_fallback: self.wake_fallback,
        }
    }
}

impl<S: Store, C: Clock> NotificationLock<S, C> {
    pub fn new(
        base: BaseLock<S, C>,
        registry: WakeRegistry<S>,
        config: &LockConfig,
    ) -> Result<Self, LockError> {
        if config.wake_fallback.is_zero() {
            return Err(LockError::config("wake fallback must be greater than zero"));
        }
        Ok(Self {
            base,
            registry,
            wake_fallback: config.wake_fallback,
        })
    }

    pub fn base(&self) -> &BaseLock<S, C> {
        &self.base
    }

    pub fn registry(&self) -> &WakeRegistry<S> {
        &self.registry
    }

    async fn acquire(
        &self,
        mode: WaitMode,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<bool, LockError> {
        let name = self.base.name();
        self.registry.start()?;
        // Releases after this point reach the reader
        let pinned = tokio::time::timeout(self.wake_fallback, self.registry.positioned()).await;
        if pinned.is_err() {
            tracing::debug!(lock = name, "wake reader not positioned yet");
        }
        let waiter = self.registry.register(name);

        loop {
            if self.base.try_acquire().await? {
                return Ok(true);
            }
            let park = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(tokio::time::Instant::now());
                    if left.is_zero() {
                        return Ok(false);
                    }
                    left.min(self.wake_fallback)
                }
                None => self.wake_fallback,
            };

            match self.base.interrupt().guard(waiter.wait(park)).await {
                Ok(true) => tracing::trace!(lock = name, "woken, retrying"),
                Ok(false) => tracing::trace!(lock = name, "no wake before timeout, retrying"),
                Err(_) => mode.on_interrupt(name)?,
            }
        }
    }
}

#[async_trait]
impl<S: Store, C: Clock> DistributedLock for NotificationLock<S, C> {
    fn name(&self) -> &str {
        self.base.name()
    }

    fn interrupt(&self) -> &Interrupt {
        self.base.interrupt()
    }

    async fn try_lock(&self) -> Result<bool, LockError> {
        self.base.try_acquire().await
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
        if self.base.release().await? {
            self.registry.released(self.base.name()).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
