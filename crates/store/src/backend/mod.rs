// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value store backends used as the coordination medium

mod memory;
#[cfg(feature = "redis-backend")]
mod redis;

pub use memory::{MemoryStore, StoreCall};
#[cfg(feature = "redis-backend")]
pub use self::redis::RedisStore;

use crate::stream::{ReadFrom, StreamEntry, StreamId};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("script not loaded: {0}")]
    NoScript(String),
    #[error("unsupported script: {0}")]
    UnsupportedScript(String),
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
    #[error("invalid stream id: {0}")]
    InvalidStreamId(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("script source error: {0}")]
    ScriptSource(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for a SET command
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Only write when the key does not exist (`NX`)
    pub only_if_absent: bool,
    /// Key expiry (`PX`)
    pub expire: Option<Duration>,
}

impl SetOptions {
    pub fn if_absent() -> Self {
        Self {
            only_if_absent: true,
            expire: None,
        }
    }

    pub fn with_expire(mut self, expire: Option<Duration>) -> Self {
        self.expire = expire;
        self
    }
}

/// One command inside an atomic [`Batch`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Set {
        key: String,
        value: String,
        options: SetOptions,
    },
    Get {
        key: String,
    },
    Del {
        key: String,
    },
}

/// Commands executed atomically, replies returned in order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<Op>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: &str, options: SetOptions) -> Self {
        self.ops.push(Op::Set {
            key: key.to_string(),
            value: value.to_string(),
            options,
        });
        self
    }

    pub fn get(mut self, key: &str) -> Self {
        self.ops.push(Op::Get {
            key: key.to_string(),
        });
        self
    }

    pub fn del(mut self, key: &str) -> Self {
        self.ops.push(Op::Del {
            key: key.to_string(),
        });
        self
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }
}

/// A single command reply
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Ok,
    Int(i64),
    Str(String),
}

impl Reply {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Reply::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Reply::Int(n) => Some(*n),
            _ => None,
        }
    }
}

/// Store primitives the lock engine coordinates through
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// Read a key
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete a key, returning whether it existed
    async fn del(&self, key: &str) -> Result<bool, StoreError>;

    /// Execute a batch atomically
    async fn exec(&self, batch: Batch) -> Result<Vec<Reply>, StoreError>;

    /// Load a script body, returning its digest
    async fn script_load(&self, body: &str) -> Result<String, StoreError>;

    /// Invoke a previously loaded script by digest
    async fn eval_digest(
        &self,
        digest: &str,
        keys: &[&str],
        args: &[&str],
    ) -> Result<Reply, StoreError>;

    /// Append an entry to a stream, returning the assigned id
    ///
    /// With `max_len` the stream is trimmed to roughly that many entries.
    async fn append(
        &self,
        stream: &str,
        fields: &[(&str, String)],
        max_len: Option<usize>,
    ) -> Result<StreamId, StoreError>;

    /// Id of the newest entry, `None` for an empty stream
    async fn last_id(&self, stream: &str) -> Result<Option<StreamId>, StoreError>;

    /// Read up to `count` entries after `from`, waiting up to `block` for new ones
    async fn read_blocking(
        &self,
        stream: &str,
        from: &ReadFrom,
        block: Duration,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError>;
}
