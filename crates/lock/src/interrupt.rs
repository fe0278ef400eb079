// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation flag owned by a lock handle
//!
//! An [`Interrupt`] is the handle's execution context: the watchdog raises it
//! when a lease is overrun, and applications may raise it to abandon a wait.
//! Interruptible waits observe the flag and clear it.

use crate::error::LockError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Shared interrupt flag; clones observe the same flag
#[derive(Clone, Debug)]
pub struct Interrupt {
    flag: Arc<watch::Sender<bool>>,
}

impl Interrupt {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    /// Raise the flag, waking every pending interruptible wait
    pub fn interrupt(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_interrupted(&self) -> bool {
        *self.flag.borrow()
    }

    /// Reset the flag, returning whether it was set
    pub fn clear(&self) -> bool {
        self.flag.send_replace(false)
    }

    /// Resolve once the flag is set (immediately if it already is)
    pub async fn interrupted(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this only returns once set
        let _ = rx.wait_for(|set| *set).await;
    }

    /// Sleep for `duration` unless interrupted first
    pub async fn sleep(&self, duration: Duration) -> Result<(), LockError> {
        self.guard(tokio::time::sleep(duration)).await
    }

    /// Run `fut` to completion unless interrupted first
    ///
    /// On interruption `fut` is dropped, the flag is cleared and
    /// [`LockError::Interrupted`] is returned.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, LockError> {
        tokio::select! {
            biased;
            out = fut => Ok(out),
            _ = self.interrupted() => {
                self.clear();
                Err(LockError::Interrupted)
            }
        }
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "interrupt_tests.rs"]
mod tests;
