// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kvl_store::StreamEntry;

const MESSAGE: &str = "message";
const TS: &str = "ts";
const RND: &str = "rnd";

/// Released-lock event as written to the wake stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Name of the released lock
    pub message: String,
    /// Sender wall-clock milliseconds
    pub ts: u64,
    /// Sender random value
    pub rnd: u32,
}

impl Envelope {
    pub fn new(message: impl Into<String>, ts: u64, rnd: u32) -> Self {
        Self {
            message: message.into(),
            ts,
            rnd,
        }
    }

    /// Stream fields in wire order
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (MESSAGE, self.message.clone()),
            (TS, self.ts.to_string()),
            (RND, self.rnd.to_string()),
        ]
    }

    /// Decode an entry; `None` when a field is missing or malformed
    pub fn from_entry(entry: &StreamEntry) -> Option<Self> {
        let message = entry.field(MESSAGE)?;
        if message.is_empty() {
            return None;
        }
        Some(Self {
            message: message.to_string(),
            ts: entry.field(TS)?.parse().ok()?,
            rnd: entry.field(RND)?.parse().ok()?,
        })
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
