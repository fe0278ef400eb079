// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kvl-lock: distributed locks over a shared key-value store
//!
//! - [`BaseLock`]: compare-and-set acquire, token-checked release
//! - [`InterruptingLock`]: leased lock enforced by a [`Watchdog`]
//! - [`NotificationLock`]: waits for wake events instead of polling
//!
//! All of them implement [`DistributedLock`].

mod base;
mod blocking;
mod contract;
mod error;
mod interrupt;
mod interrupting;
pub mod notify;
mod scoped;
pub mod watchdog;

pub use base::{BaseLock, BaseLockBuilder, LeaseState};
pub use blocking::BlockingLock;
pub use contract::DistributedLock;
pub use error::LockError;
pub use interrupt::Interrupt;
pub use interrupting::InterruptingLock;
pub use notify::{Envelope, NotificationLock, StreamTransport, Waiter, WakeRegistry};
pub use scoped::{try_under_lock, under_lock};
pub use watchdog::{
    DedicatedScheduler, ExpiryTask, PoolScheduler, ScheduledTask, TaskScheduler, Watchdog,
    WatchdogTask,
};
