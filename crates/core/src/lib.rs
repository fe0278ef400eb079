// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kvl-core: shared building blocks for the kvlock workspace
//!
//! This crate provides:
//! - A clock abstraction with a controllable fake for tests
//! - Fencing token generation
//! - Settings loaded from TOML

pub mod clock;
pub mod config;
pub mod token;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ConfigError, LockConfig, Settings, StoreConfig, TransportConfig, WatchdogConfig,
};
pub use token::{random_nonce, FencingToken, MonotonicTokenGen, SequentialTokenGen, TokenGen};
