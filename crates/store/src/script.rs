// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-side scripts: resolution from a source, load-once, invoke by digest

use crate::backend::{Reply, Store, StoreError};
use std::path::PathBuf;
use std::sync::Mutex;

/// Delete a key only while it holds the caller's token
pub const COMPARE_AND_DELETE: &str = include_str!("../scripts/compare_and_delete.lua");

/// Where a script body comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptSource {
    /// A script shipped with this crate, by name
    Packaged(&'static str),
    /// A script file on disk
    File(PathBuf),
    /// An inline body
    Literal(String),
}

impl ScriptSource {
    /// Resolve the script body
    pub fn resolve(&self) -> Result<String, StoreError> {
        match self {
            ScriptSource::Packaged(name) => packaged(name)
                .map(str::to_string)
                .ok_or_else(|| StoreError::ScriptSource(format!("no packaged script {name}"))),
            ScriptSource::File(path) => std::fs::read_to_string(path).map_err(|e| {
                StoreError::ScriptSource(format!("cannot read {}: {}", path.display(), e))
            }),
            ScriptSource::Literal(body) => Ok(body.clone()),
        }
    }
}

fn packaged(name: &str) -> Option<&'static str> {
    match name {
        "compare_and_delete" => Some(COMPARE_AND_DELETE),
        _ => None,
    }
}

/// Whether `body` is the packaged compare-and-delete script
pub fn is_compare_and_delete(body: &str) -> bool {
    body.trim() == COMPARE_AND_DELETE.trim()
}

/// A script loaded lazily and then invoked by digest
#[derive(Debug)]
pub struct Script {
    body: String,
    digest: Mutex<Option<String>>,
}

impl Script {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            digest: Mutex::new(None),
        }
    }

    pub fn from_source(source: &ScriptSource) -> Result<Self, StoreError> {
        Ok(Self::new(source.resolve()?))
    }

    /// The packaged compare-and-delete script
    pub fn compare_and_delete() -> Self {
        Self::new(COMPARE_AND_DELETE)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Digest from the last load, if any
    pub fn cached_digest(&self) -> Option<String> {
        self.digest
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Invoke the script, loading it first if needed
    ///
    /// A `NoScript` reply (the store dropped its script cache) triggers one
    /// reload and retry.
    pub async fn invoke<S: Store>(
        &self,
        store: &S,
        keys: &[&str],
        args: &[&str],
    ) -> Result<Reply, StoreError> {
        let digest = match self.cached_digest() {
            Some(digest) => digest,
            None => self.load(store).await?,
        };

        match store.eval_digest(&digest, keys, args).await {
            Err(StoreError::NoScript(_)) => {
                tracing::debug!(digest = %digest, "script cache miss, reloading");
                let digest = self.load(store).await?;
                store.eval_digest(&digest, keys, args).await
            }
            other => other,
        }
    }

    async fn load<S: Store>(&self, store: &S) -> Result<String, StoreError> {
        let digest = store.script_load(&self.body).await?;
        *self.digest.lock().unwrap_or_else(|e| e.into_inner()) = Some(digest.clone());
        Ok(digest)
    }
}

#[cfg(test)]
#[path = "script_tests.rs"]
mod tests;
