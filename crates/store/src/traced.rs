// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::backend::{Batch, Reply, Store, StoreError};
use crate::stream::{ReadFrom, StreamEntry, StreamId};
use async_trait::async_trait;
use std::time::Duration;
use tracing::Instrument;

/// Wrapper that adds tracing to any Store
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for TracedStore<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.inner.get(key).await;
        match &result {
            Ok(value) => tracing::trace!(key, present = value.is_some(), "get"),
            Err(e) => tracing::warn!(key, error = %e, "get failed"),
        }
        result
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.del", key);
        async move {
            let result = self.inner.del(key).await;
            match &result {
                Ok(removed) => tracing::info!(removed, "deleted"),
                Err(e) => tracing::error!(error = %e, "del failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn exec(&self, batch: Batch) -> Result<Vec<Reply>, StoreError> {
        let span = tracing::debug_span!("store.exec", ops = batch.len());
        async move {
            let start = std::time::Instant::now();
            let result = self.inner.exec(batch).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(replies) => tracing::debug!(
                    replies = ?replies,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "batch executed"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "batch failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn script_load(&self, body: &str) -> Result<String, StoreError> {
        let span = tracing::info_span!("store.script_load", body_len = body.len());
        async move {
            let result = self.inner.script_load(body).await;
            match &result {
                Ok(digest) => tracing::info!(digest = %digest, "script loaded"),
                Err(e) => tracing::error!(error = %e, "script load failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn eval_digest(
        &self,
        digest: &str,
        keys: &[&str],
        args: &[&str],
    ) -> Result<Reply, StoreError> {
        let span = tracing::debug_span!("store.eval", digest, keys = ?keys);
        async move {
            let result = self.inner.eval_digest(digest, keys, args).await;
            match &result {
                Ok(reply) => tracing::debug!(reply = ?reply, "script evaluated"),
                // NoScript is recovered by reloading
                Err(StoreError::NoScript(_)) => tracing::debug!("script not cached"),
                Err(e) => tracing::error!(error = %e, "script failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn append(
        &self,
        stream: &str,
        fields: &[(&str, String)],
        max_len: Option<usize>,
    ) -> Result<StreamId, StoreError> {
        let result = self.inner.append(stream, fields, max_len).await;
        match &result {
            Ok(id) => tracing::debug!(stream, entry_id = %id, max_len, "appended"),
            Err(e) => tracing::error!(stream, error = %e, "append failed"),
        }
        result
    }

    async fn last_id(&self, stream: &str) -> Result<Option<StreamId>, StoreError> {
        let result = self.inner.last_id(stream).await;
        match &result {
            Ok(Some(id)) => tracing::trace!(stream, entry_id = %id, "stream tail"),
            Ok(None) => tracing::trace!(stream, "stream empty"),
            Err(e) => tracing::error!(stream, error = %e, "stream tail lookup failed"),
        }
        result
    }

    async fn read_blocking(
        &self,
        stream: &str,
        from: &ReadFrom,
        block: Duration,
        count: usize,
    ) -> Result<Vec<StreamEntry>, StoreError> {
        let result = self.inner.read_blocking(stream, from, block, count).await;
        match &result {
            Ok(entries) => {
                tracing::trace!(stream, from = %from, entries = entries.len(), "read")
            }
            Err(e) => tracing::error!(stream, from = %from, error = %e, "read failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
