// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-driven wake-up for waiting lock handles
//!
//! Every ownership-confirmed release appends an [`Envelope`] to a shared
//! append-only stream. Each process runs one reader per [`WakeRegistry`],
//! which wakes the local [`NotificationLock`] waiters of that lock name.

mod envelope;
mod lock;
mod registry;
mod transport;

pub use envelope::Envelope;
pub use lock::NotificationLock;
pub use registry::{WakeRegistry, Waiter};
pub use transport::StreamTransport;
