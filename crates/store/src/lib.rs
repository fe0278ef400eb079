// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Coordination store access for kvlock
//!
//! The lock engine only talks to the [`Store`] trait. Backends:
//! - [`MemoryStore`]: in-process, shared between clones
//! - `RedisStore`: a Redis server (feature `redis-backend`)

pub mod backend;
pub mod script;
pub mod stream;
pub mod traced;

pub use backend::{Batch, MemoryStore, Op, Reply, SetOptions, Store, StoreCall, StoreError};
#[cfg(feature = "redis-backend")]
pub use backend::RedisStore;
pub use script::{Script, ScriptSource, COMPARE_AND_DELETE};
pub use stream::{ReadFrom, StreamEntry, StreamId};
pub use traced::TracedStore;
