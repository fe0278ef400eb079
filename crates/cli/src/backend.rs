// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store selection from a URL

use anyhow::{bail, Result};
use kvl_store::MemoryStore;
#[cfg(feature = "redis")]
use kvl_store::RedisStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Memory,
    Redis,
}

impl Scheme {
    pub fn parse(url: &str) -> Result<Self> {
        match url.split_once("://") {
            Some(("memory", _)) => Ok(Scheme::Memory),
            Some(("redis" | "rediss", _)) => Ok(Scheme::Redis),
            _ => bail!("unsupported store url: {url}"),
        }
    }
}

/// A connected store of whichever kind the URL named
pub enum Backend {
    Memory(MemoryStore),
    #[cfg(feature = "redis")]
    Redis(RedisStore),
}

pub async fn connect(url: &str) -> Result<Backend> {
    match Scheme::parse(url)? {
        Scheme::Memory => Ok(Backend::Memory(MemoryStore::new())),
        #[cfg(feature = "redis")]
        Scheme::Redis => Ok(Backend::Redis(RedisStore::connect(url).await?)),
        #[cfg(not(feature = "redis"))]
        Scheme::Redis => bail!("kvl was built without redis support"),
    }
}

/// Run `$body` with `$store` bound to the traced store behind `$backend`
macro_rules! dispatch {
    ($backend:expr, $store:ident => $body:expr) => {
        match $backend {
            $crate::backend::Backend::Memory(inner) => {
                let $store = kvl_store::TracedStore::new(inner);
                $body
            }
            #[cfg(feature = "redis")]
            $crate::backend::Backend::Redis(inner) => {
                let $store = kvl_store::TracedStore::new(inner);
                $body
            }
        }
    };
}
pub(crate) use dispatch;

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
