// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for lock operations

use kvl_store::StoreError;
use thiserror::Error;

/// Errors that can occur while acquiring or releasing a lock
#[derive(Debug, Error)]
pub enum LockError {
    #[error("invalid lock configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("interrupted")]
    Interrupted,
    #[error("watchdog failed to start: {0}")]
    Watchdog(#[source] std::io::Error),
}

impl LockError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        LockError::Config(reason.into())
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, LockError::Interrupted)
    }
}
