// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fencing token generation
//!
//! A fencing token is written as the lock key's value and identifies the
//! claimant that currently owns it.

use crate::clock::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide sequence shared by every [`MonotonicTokenGen`]
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque claimant identity stored as a lock key's value
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FencingToken(String);

impl FencingToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FencingToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates fencing tokens for a lock name
pub trait TokenGen: Clone + Send + Sync {
    fn next(&self, name: &str) -> FencingToken;
}

/// Production generator: `{name}:{wall-ms}:{pid}:{sequence}:{random}`
///
/// The sequence is a process-wide atomic counter, so tokens minted in the same
/// millisecond never collide within one process. The pid and random suffix
/// separate processes.
#[derive(Clone, Default)]
pub struct MonotonicTokenGen<C: Clock = SystemClock> {
    clock: C,
}

impl<C: Clock> MonotonicTokenGen<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> TokenGen for MonotonicTokenGen<C> {
    fn next(&self, name: &str) -> FencingToken {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        FencingToken(format!(
            "{}:{}:{}:{}:{:08x}",
            name,
            self.clock.epoch_millis(),
            std::process::id(),
            seq,
            random_nonce()
        ))
    }
}

/// Sequential token generator for testing
#[derive(Clone)]
pub struct SequentialTokenGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialTokenGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialTokenGen {
    fn default() -> Self {
        Self::new("token")
    }
}

impl TokenGen for SequentialTokenGen {
    fn next(&self, name: &str) -> FencingToken {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        FencingToken(format!("{}-{}-{}", self.prefix, name, n))
    }
}

/// Random 32-bit value drawn from a v4 UUID
pub fn random_nonce() -> u32 {
    uuid::Uuid::new_v4().as_u128() as u32
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
