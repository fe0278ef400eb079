// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process store
//!
//! Shares state between clones, so several handles in one process (or one
//! test) coordinate exactly as separate processes would through a server.
//! Keys expire lazily on access. Only the packaged compare-and-delete script
//! can be evaluated.

use super::{Batch, Op, Reply, Store, StoreError};
use crate::script::is_compare_and_delete;
use crate::stream::{ReadFrom, StreamEntry, StreamId};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

/// Recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get { key: String },
    Del { key: String },
    Exec { ops: Vec<Op> },
    ScriptLoad,
    EvalDigest { digest: String, keys: Vec<String> },
    Append { stream: String },
    LastId { stream: String },
    ReadBlocking { stream: String, from: ReadFrom },
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Default)]
struct MemoryState {
    keys: HashMap<String, Entry>,
    scripts: HashMap<String, String>,
    streams: HashMap<String, Vec<StreamEntry>>,
    calls: Vec<StoreCall>,
    unavailable: bool,
}

impl MemoryState {
    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn live_value(&mut self, key: &str) -> Option<String> {
        let now = Instant::now();
        if self.keys.get(key).is_some_and(|e| e.is_expired(now)) {
            self.keys.remove(key);
        }
        self.keys.get(key).map(|e| e.value.clone())
    }

    fn apply(&mut self, op: Op) -> Reply {
        match op {
            Op::Set {
                key,
                value,
                options,
            } => {
                if options.only_if_absent && self.live_value(&key).is_some() {
                    return Reply::Nil;
                }
                let expires_at = options.expire.map(|ttl| Instant::now() + ttl);
                self.keys.insert(key, Entry { value, expires_at });
                Reply::Ok
            }
            Op::Get { key } => self.live_value(&key).map_or(Reply::Nil, Reply::Str),
            Op::Del { key } => {
                let existed = self.live_value(&key).is_some();
                self.keys.remove(&key);
                Reply::Int(i64::from(existed))
            }
        }
    }

    fn entries_after(&self, stream: &str, cursor: StreamId, count: usize) -> Vec<StreamEntry> {
        self.streams
            .get(stream)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.id > cursor)
                    .take(count)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn last_id(&self, stream: &str) -> StreamId {
        self.streams
            .get(stream)
            .and_then(|entries| entries.last())
            .map(|e| e.id)
            .unwrap_or_default()
    }
}

struct Inner {
    state: Mutex<MemoryState>,
    appended: Notify,
}

/// In-memory store shared between clones
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(MemoryState::default()),
                appended: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Drop all loaded scripts, as a server-side `SCRIPT FLUSH` would
    pub fn flush_scripts(&self) {
        self.state().scripts.clear();
    }

    /// Write a key directly, bypassing call recording
    pub fn put(&self, key: &str, value: &str, expire: Option<Duration>) {
        self.state().keys.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: expire.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    /// Read a key directly, bypassing call recording
    pub fn peek(&self, key: &str) -> Option<String> {
        self.state().live_value(key)
    }

    /// Number of entries appended to a stream
    pub fn stream_len(&self, stream: &str) -> usize {
        self.state().streams.get(stream).map_or(0, Vec::len)
    }

    /// Entries appended to a stream, oldest first
    pub fn stream_entries(&self, stream: &str) -> Vec<StreamEntry> {
        self.state()
            .streams
            .get(stream)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn wall_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Get {
            key: key.to_string(),
        });
        state.check_available()?;
        Ok(state.live_value(key))
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Del {
            key: key.to_string(),
        });
        state.check_available()?;
        let reply = state.apply(Op::Del {
            key: key.to_string(),
        });
        Ok(reply == Reply::Int(1))
    }

    async fn exec(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::Exec {
            ops: batch.ops().to_vec(),
        });
        state.check_available()?;
        // Holding the state lock for the whole batch makes it atomic
        Ok(batch
            .into_ops()
            .into_iter()
            .map(|op| state.apply(op))
            .collect())
    }

    async fn script_load(&self, body: &str) -> Result<String, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::ScriptLoad);
        state.check_available()?;
        let digest = format!("{:x}", Sha256::digest(body.as_bytes()));
        state.scripts.insert(digest.clone(), body.to_string());
        Ok(digest)
    }

    async fn eval_digest(
        &self,
        digest: &str,
        keys: &[&str],
        args: &[&str],
    ) -> Result<Reply, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::EvalDigest {
            digest: digest.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        });
        state.check_available()?;

        let body = state
            .scripts
            .get(digest)
            .cloned()
            .ok_or_else(|| StoreError::NoScript(digest.to_string()))?;
        if !is_compare_and_delete(&body) {
            return Err(StoreError::UnsupportedScript(digest.to_string()));
        }

        let (Some(key), Some(token)) = (keys.first(), args.first()) else {
            return Err(StoreError::Backend(
                "compare-and-delete needs one key and one argument".to_string(),
            ));
        };
        if state.live_value(key).as_deref() == Some(*token) {
            state.keys.remove(*key);
            Ok(Reply::Int(1))
        } else {
            Ok(Reply::Int(0))
        }
    }

    async fn append(
        &self,
        stream: &str,
        fields: &[(&str, String)],
        max_len: Option<usize>,
    ) -> Result<StreamId, StoreError> {
        let id = {
            let mut state = self.state();
            state.calls.push(StoreCall::Append {
                stream: stream.to_string(),
            });
            state.check_available()?;

            let id = state.last_id(stream).successor_at(wall_millis());
            let entry = StreamEntry {
                id,
                fields: fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            };
            let entries = state.streams.entry(stream.to_string()).or_default();
            entries.push(entry);
            if let Some(max_len) = max_len {
                // The newest entry stays so ids keep increasing
                let excess = entries.len().saturating_sub(max_len.max(1));
                entries.drain(..excess);
            }
            id
        };
        self.inner.appended.notify_waiters();
        Ok(id)
    }

    async fn last_id(&self, stream: &str) -> Result<Option<StreamId>, StoreError> {
        let mut state = self.state();
        state.calls.push(StoreCall::LastId {
            stream: stream.to_string(),
        });
        state.check_available()?;
        Ok(state
            .streams
            .get(stream)
            .and_then(|entries| entries.last())
            .map(|e| e.id))
    }

    async fn read_blocking(
        &self,
        stream: &str,
        from: &ReadFrom,
        block: Duration,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let cursor = {
            let mut state = self.state();
            state.calls.push(StoreCall::ReadBlocking {
                stream: stream.to_string(),
                from: *from,
            });
            state.check_available()?;
            match from {
                ReadFrom::Latest => state.last_id(stream),
                ReadFrom::After(id) => *id,
            }
        };

        let deadline = tokio::time::Instant::now() + block;
        loop {
            let notified = self.inner.appended.notified();
            tokio::pin!(notified);
            // Register before checking so an append in between is not missed
            notified.as_mut().enable();

            {
                let state = self.state();
                state.check_available()?;
                let entries = state.entries_after(stream, cursor, count);
                if !entries.is_empty() {
                    return Ok(entries);
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
