// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings for locks, the lease watchdog and the wake transport
//!
//! Every section has defaults, so an empty TOML document is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Store connection settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// `redis://host:port` or `memory://`
    pub url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

/// Retry settings shared by every lock flavour
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LockConfig {
    /// Sleep between CAS attempts for polling locks
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
    /// Longest a notification waiter parks before re-checking on its own
    #[serde(with = "humantime_serde")]
    pub wake_fallback: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(100),
            wake_fallback: Duration::from_secs(5),
        }
    }
}

impl LockConfig {
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_wake_fallback(mut self, fallback: Duration) -> Self {
        self.wake_fallback = fallback;
        self
    }
}

/// Lease watchdog timing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchdogConfig {
    /// How long before the lease deadline the watchdog fires
    #[serde(with = "humantime_serde")]
    pub safety_margin: Duration,
    /// Pause between interrupting the holder and force-releasing
    #[serde(with = "humantime_serde")]
    pub recovery_delay: Duration,
    /// Delay used when the computed remaining lease is not positive
    #[serde(with = "humantime_serde")]
    pub fallback_delay: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_millis(30),
            recovery_delay: Duration::from_millis(20),
            fallback_delay: Duration::from_millis(10),
        }
    }
}

impl WatchdogConfig {
    pub fn with_safety_margin(mut self, margin: Duration) -> Self {
        self.safety_margin = margin;
        self
    }

    pub fn with_recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }

    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }
}

/// Wake event log settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Name of the append-only log shared by every process
    pub stream: String,
    /// How long one blocking read waits for new entries
    #[serde(with = "humantime_serde")]
    pub block_timeout: Duration,
    /// Maximum entries fetched per read
    pub batch_size: usize,
    /// Approximate number of entries the stream is trimmed to on append
    pub max_len: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            stream: "kvl:wake".to_string(),
            block_timeout: Duration::from_secs(1),
            batch_size: 16,
            max_len: 1024,
        }
    }
}

impl TransportConfig {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            ..Self::default()
        }
    }

    pub fn with_block_timeout(mut self, timeout: Duration) -> Self {
        self.block_timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }
}

/// Complete settings document
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub store: StoreConfig,
    pub lock: LockConfig,
    pub watchdog: WatchdogConfig,
    pub transport: TransportConfig,
}

impl Settings {
    /// Load and validate settings from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.url.trim().is_empty() {
            return Err(invalid("store.url", "must not be empty"));
        }
        non_zero("lock.retry_interval", self.lock.retry_interval)?;
        non_zero("lock.wake_fallback", self.lock.wake_fallback)?;
        non_zero("watchdog.recovery_delay", self.watchdog.recovery_delay)?;
        non_zero("watchdog.fallback_delay", self.watchdog.fallback_delay)?;
        if self.transport.stream.trim().is_empty() {
            return Err(invalid("transport.stream", "must not be empty"));
        }
        non_zero("transport.block_timeout", self.transport.block_timeout)?;
        if self.transport.batch_size == 0 {
            return Err(invalid("transport.batch_size", "must be at least 1"));
        }
        if self.transport.max_len == 0 {
            return Err(invalid("transport.max_len", "must be at least 1"));
        }
        Ok(())
    }
}

fn non_zero(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value.is_zero() {
        return Err(invalid(field, "must be greater than zero"));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
