// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings resolution: file first, then the store override

use kvl_core::{ConfigError, Settings};
use std::path::Path;

pub fn resolve(config: Option<&Path>, store: Option<String>) -> Result<Settings, ConfigError> {
    let mut settings = match config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(url) = store {
        settings.store.url = url;
        settings.validate()?;
    }
    Ok(settings)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
