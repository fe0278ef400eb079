// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compare-and-set lock over a single store key
//!
//! Acquire writes the handle's token with `SET NX [PX]` and reads the key back
//! in the same atomic batch. Release re-validates ownership and then deletes
//! through the compare-and-delete script, so a handle never removes a key
//! that another claimant has taken over.

use crate::blocking::BlockingLock;
use crate::contract::{DistributedLock, WaitMode};
use crate::error::LockError;
use crate::interrupt::Interrupt;
use async_trait::async_trait;
use kvl_core::{Clock, FencingToken, LockConfig, MonotonicTokenGen, SystemClock, TokenGen};
use kvl_store::{Batch, Reply, Script, ScriptSource, SetOptions, Store};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// Locally cached lease bookkeeping, a hint re-validated against the store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LeaseState {
    /// When the current acquisition succeeded
    pub lease_moment: Option<Instant>,
    /// `lease_moment + lease`, when a lease is configured
    pub time_limit: Option<Instant>,
}

struct Inner<S, C> {
    store: S,
    clock: C,
    name: String,
    token: FencingToken,
    lease: Option<Duration>,
    store_expiry: bool,
    retry_interval: Duration,
    release_script: Script,
    interrupt: Interrupt,
    state: Mutex<LeaseState>,
}

/// Lock handle using compare-and-set on the store
pub struct BaseLock<S, C = SystemClock> {
    inner: Arc<Inner<S, C>>,
}

impl<S, C> Clone for BaseLock<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for [`BaseLock`]
pub struct BaseLockBuilder<S, C = SystemClock> {
    store: S,
    clock: C,
    name: String,
    token: Option<FencingToken>,
    lease: Option<Duration>,
    store_expiry: bool,
    retry_interval: Duration,
    release_script: ScriptSource,
}

impl<S: Store> BaseLock<S> {
    pub fn builder(store: S, name: impl Into<String>) -> BaseLockBuilder<S> {
        BaseLockBuilder {
            store,
            clock: SystemClock,
            name: name.into(),
            token: None,
            lease: None,
            store_expiry: true,
            retry_interval: LockConfig::default().retry_interval,
            release_script: ScriptSource::Packaged("compare_and_delete"),
        }
    }
}

impl<S: Store, C: Clock> BaseLockBuilder<S, C> {
    /// Bound each acquisition to `lease`
    pub fn lease(mut self, lease: Duration) -> Self {
        self.lease = Some(lease);
        self
    }

    /// Whether the store key also carries the lease as a native expiry
    pub fn store_expiry(mut self, enabled: bool) -> Self {
        self.store_expiry = enabled;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Apply `[lock]` settings
    pub fn config(mut self, config: &LockConfig) -> Self {
        self.retry_interval = config.retry_interval;
        self
    }

    pub fn clock<C2: Clock>(self, clock: C2) -> BaseLockBuilder<S, C2> {
        BaseLockBuilder {
            store: self.store,
            clock,
            name: self.name,
            token: self.token,
            lease: self.lease,
            store_expiry: self.store_expiry,
            retry_interval: self.retry_interval,
            release_script: self.release_script,
        }
    }

    /// Draw this handle's token from `tokens`
    pub fn token_gen(mut self, tokens: &impl TokenGen) -> Self {
        self.token = Some(tokens.next(&self.name));
        self
    }

    /// Use a fixed token
    pub fn token(mut self, token: FencingToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn release_script(mut self, source: ScriptSource) -> Self {
        self.release_script = source;
        self
    }

    pub fn build(self) -> Result<BaseLock<S, C>, LockError> {
        if self.name.is_empty() {
            return Err(LockError::config("lock name must not be empty"));
        }
        if self.lease.is_some_and(|lease| lease.is_zero()) {
            return Err(LockError::config("lease must be greater than zero"));
        }
        if self.retry_interval.is_zero() {
            return Err(LockError::config("retry interval must be greater than zero"));
        }

        let release_script = Script::from_source(&self.release_script)?;
        let token = match self.token {
            Some(token) => token,
            None => MonotonicTokenGen::new(self.clock.clone()).next(&self.name),
        };

        Ok(BaseLock {
            inner: Arc::new(Inner {
                store: self.store,
                clock: self.clock,
                name: self.name,
                token,
                lease: self.lease,
                store_expiry: self.store_expiry,
                retry_interval: self.retry_interval,
                release_script,
                interrupt: Interrupt::new(),
                state: Mutex::new(LeaseState::default()),
            }),
        })
    }
}

impl<S: Store, C: Clock> BaseLock<S, C> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn token(&self) -> &FencingToken {
        &self.inner.token
    }

    pub fn lease(&self) -> Option<Duration> {
        self.inner.lease
    }

    pub fn retry_interval(&self) -> Duration {
        self.inner.retry_interval
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.inner.interrupt
    }

    pub fn store(&self) -> &S {
        &self.inner.store
    }

    pub(crate) fn clock(&self) -> &C {
        &self.inner.clock
    }

    pub fn lease_state(&self) -> LeaseState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reset_lease(&self) {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner()) = LeaseState::default();
    }

    /// One compare-and-set attempt
    pub async fn try_acquire(&self) -> Result<bool, LockError> {
        let name = self.name();
        let token = self.token().as_str();

        let mut options = SetOptions::if_absent();
        if self.inner.store_expiry {
            options = options.with_expire(self.inner.lease);
        }
        let replies = self
            .inner
            .store
            .exec(Batch::new().set(name, token, options).get(name))
            .await?;

        let [created, current] = replies.as_slice() else {
            return Err(LockError::Protocol(format!(
                "acquire expected 2 replies, got {}",
                replies.len()
            )));
        };
        let created = match created {
            Reply::Ok => true,
            Reply::Nil => false,
            other => {
                return Err(LockError::Protocol(format!(
                    "unexpected SET reply {other:?}"
                )))
            }
        };
        let holder = match current {
            Reply::Str(value) => Some(value.as_str()),
            Reply::Nil => None,
            other => {
                return Err(LockError::Protocol(format!(
                    "unexpected GET reply {other:?}"
                )))
            }
        };

        if created && holder == Some(token) {
            let now = self.inner.clock.now();
            *self.inner.state.lock().unwrap_or_else(|e| e.into_inner()) = LeaseState {
                lease_moment: Some(now),
                time_limit: self.inner.lease.map(|lease| now + lease),
            };
            tracing::debug!(lock = name, token, "acquired");
            Ok(true)
        } else {
            tracing::trace!(lock = name, holder = ?holder, "lock busy");
            Ok(false)
        }
    }

    /// Whether this handle still owns the key
    ///
    /// An elapsed lease answers `false` without asking the store.
    pub async fn verify_ownership(&self) -> Result<bool, LockError> {
        if self.inner.lease.is_some() {
            let state = self.lease_state();
            if state
                .time_limit
                .is_some_and(|limit| self.inner.clock.now() >= limit)
            {
                return Ok(false);
            }
        }
        self.holds_key().await
    }

    async fn holds_key(&self) -> Result<bool, LockError> {
        let current = self.inner.store.get(self.name()).await?;
        Ok(current.as_deref() == Some(self.token().as_str()))
    }

    /// Release if owned; `true` when this call deleted the key
    pub async fn release(&self) -> Result<bool, LockError> {
        let result = match self.verify_ownership().await {
            Ok(true) => self.delete_if_owner().await,
            Ok(false) => {
                tracing::trace!(lock = self.name(), "release skipped, not the holder");
                Ok(false)
            }
            Err(e) => Err(e),
        };
        self.reset_lease();
        result
    }

    /// Release checked against the store only, ignoring the cached lease
    pub async fn force_release(&self) -> Result<bool, LockError> {
        let result = match self.holds_key().await {
            Ok(true) => self.delete_if_owner().await,
            Ok(false) => Ok(false),
            Err(e) => Err(e),
        };
        self.reset_lease();
        result
    }

    async fn delete_if_owner(&self) -> Result<bool, LockError> {
        let reply = self
            .inner
            .release_script
            .invoke(&self.inner.store, &[self.name()], &[self.token().as_str()])
            .await?;
        match reply {
            Reply::Int(1) => {
                tracing::debug!(lock = self.name(), token = %self.token(), "released");
                Ok(true)
            }
            Reply::Int(0) => {
                tracing::debug!(lock = self.name(), "key changed hands before release");
                Ok(false)
            }
            other => Err(LockError::Protocol(format!(
                "unexpected release reply {other:?}"
            ))),
        }
    }

    pub(crate) async fn acquire(
        &self,
        mode: WaitMode,
        deadline: Option<tokio::time::Instant>,
    ) -> Result<bool, LockError> {
        poll_acquire(
            self.name(),
            self.interrupt(),
            self.retry_interval(),
            mode,
            deadline,
            move || self.try_acquire(),
        )
        .await
    }

    /// Wrap for synchronous callers on the current runtime
    pub fn into_blocking(self) -> Result<BlockingLock<S, C>, LockError> {
        let handle = Handle::try_current()
            .map_err(|_| LockError::config("blocking lock needs a tokio runtime"))?;
        self.into_blocking_with(handle)
    }

    /// Wrap for synchronous callers driving `handle`
    ///
    /// Leased locks are rejected: a blocking caller cannot be interrupted.
    pub fn into_blocking_with(self, handle: Handle) -> Result<BlockingLock<S, C>, LockError> {
        if self.lease().is_some() {
            return Err(LockError::config(
                "a lock with a lease cannot be used as a blocking lock",
            ));
        }
        Ok(BlockingLock::new(self, handle))
    }
}

/// Retry `attempt` every `retry` until it succeeds or `deadline` passes
pub(crate) async fn poll_acquire<F, Fut>(
    name: &str,
    interrupt: &Interrupt,
    retry: Duration,
    mode: WaitMode,
    deadline: Option<tokio::time::Instant>,
    mut attempt: F,
) -> Result<bool, LockError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, LockError>>,
{
    loop {
        if attempt().await? {
            return Ok(true);
        }
        let pause = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(tokio::time::Instant::now());
                if left.is_zero() {
                    return Ok(false);
                }
                left.min(retry)
            }
            None => retry,
        };
        if interrupt.sleep(pause).await.is_err() {
            mode.on_interrupt(name)?;
        }
    }
}

#[async_trait]
impl<S: Store, C: Clock> DistributedLock for BaseLock<S, C> {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn interrupt(&self) -> &Interrupt {
        &self.inner.interrupt
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
        let owned = self.verify_ownership().await?;
        if !owned {
            self.reset_lease();
        }
        Ok(owned)
    }

    async fn unlock(&self) -> Result<(), LockError> {
        self.release().await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "base_tests.rs"]
mod tests;
