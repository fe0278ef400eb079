// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reader and writer for the shared wake stream
//!
//! One background reader per transport follows the stream from the moment it
//! starts. It pins its cursor to the newest entry id before the first read,
//! so nothing appended after that point is skipped. The cursor only moves
//! forward, so each entry is handled at most once per process. Entries this
//! transport wrote itself are dropped.

use super::envelope::Envelope;
use crate::error::LockError;
use kvl_core::{random_nonce, Clock, SystemClock, TransportConfig};
use kvl_store::{ReadFrom, Store, StreamId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Envelopes remembered for echo suppression
const SENT_CAPACITY: usize = 256;

struct Sent {
    envelope: Envelope,
    id: Option<StreamId>,
}

#[derive(Default)]
struct SentLog {
    records: VecDeque<Sent>,
}

impl SentLog {
    fn record(&mut self, envelope: Envelope) {
        if self.records.len() >= SENT_CAPACITY {
            self.records.pop_front();
        }
        self.records.push_back(Sent { envelope, id: None });
    }

    fn confirm(&mut self, envelope: &Envelope, id: StreamId) {
        if let Some(sent) = self
            .records
            .iter_mut()
            .find(|s| s.id.is_none() && s.envelope == *envelope)
        {
            sent.id = Some(id);
        }
    }

    fn forget(&mut self, envelope: &Envelope) {
        self.records
            .retain(|s| !(s.id.is_none() && s.envelope == *envelope));
    }

    /// Remove and report a record matching an inbound entry
    fn take_echo(&mut self, envelope: &Envelope, id: StreamId) -> bool {
        let position = self
            .records
            .iter()
            .position(|s| s.envelope == *envelope && s.id.map_or(true, |known| known == id));
        match position {
            Some(index) => {
                self.records.remove(index);
                true
            }
            None => false,
        }
    }
}

fn sent_log(sent: &Mutex<SentLog>) -> MutexGuard<'_, SentLog> {
    sent.lock().unwrap_or_else(|e| e.into_inner())
}

/// Wake-stream transport
pub struct StreamTransport<S, C = SystemClock> {
    store: S,
    clock: C,
    config: TransportConfig,
    sent: Arc<Mutex<SentLog>>,
    running: Arc<AtomicBool>,
    positioned: Arc<watch::Sender<bool>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Store, C: Clock> StreamTransport<S, C> {
    pub fn new(store: S, clock: C, config: TransportConfig) -> Result<Self, LockError> {
        if config.stream.is_empty() {
            return Err(LockError::config("wake stream name must not be empty"));
        }
        if config.block_timeout.is_zero() {
            return Err(LockError::config("block timeout must be greater than zero"));
        }
        if config.batch_size == 0 {
            return Err(LockError::config("batch size must be greater than zero"));
        }
        if config.max_len == 0 {
            return Err(LockError::config("stream max length must be greater than zero"));
        }
        let (positioned, _) = watch::channel(false);
        Ok(Self {
            store,
            clock,
            config,
            sent: Arc::new(Mutex::new(SentLog::default())),
            running: Arc::new(AtomicBool::new(false)),
            positioned: Arc::new(positioned),
            reader: Mutex::new(None),
        })
    }

    pub fn stream(&self) -> &str {
        &self.config.stream
    }

    /// Append a released-event for `name`
    pub async fn emit(&self, name: &str) -> Result<StreamId, LockError> {
        let envelope = Envelope::new(name, self.clock.epoch_millis(), random_nonce());
        sent_log(&self.sent).record(envelope.clone());

        let appended = self
            .store
            .append(self.stream(), &envelope.fields(), Some(self.config.max_len))
            .await;
        match appended {
            Ok(id) => {
                sent_log(&self.sent).confirm(&envelope, id);
                tracing::debug!(stream = self.stream(), lock = name, entry_id = %id, "wake emitted");
                Ok(id)
            }
            Err(e) => {
                sent_log(&self.sent).forget(&envelope);
                Err(e.into())
            }
        }
    }

    /// Spawn the reader on the current runtime
    ///
    /// Returns `false` when a reader was already started. A reader that
    /// stopped on an error is not restarted.
    pub fn start<F>(&self, on_event: F) -> Result<bool, LockError>
    where
        F: Fn(Envelope) + Send + Sync + 'static,
    {
        let mut reader = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        if reader.is_some() {
            return Ok(false);
        }
        let handle = Handle::try_current()
            .map_err(|_| LockError::config("wake stream reader needs a tokio runtime"))?;

        self.running.store(true, Ordering::SeqCst);
        *reader = Some(handle.spawn(read_loop(
            self.store.clone(),
            self.config.clone(),
            Arc::clone(&self.sent),
            Arc::clone(&self.running),
            Arc::clone(&self.positioned),
            on_event,
        )));
        tracing::debug!(stream = self.stream(), "wake reader started");
        Ok(true)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Wait until the started reader has pinned its cursor
    ///
    /// Returns at once when the reader was never started, was stopped, or
    /// failed before pinning.
    pub async fn positioned(&self) {
        let started = self
            .reader
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some();
        if !started {
            return;
        }
        let mut rx = self.positioned.subscribe();
        // The sender lives in `self`, so the channel never closes here
        let _ = rx.wait_for(|positioned| *positioned).await;
    }

    /// Abort the reader
    pub fn stop(&self) {
        let reader = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = reader.as_ref() {
            task.abort();
        }
        self.running.store(false, Ordering::SeqCst);
        self.positioned.send_replace(true);
    }
}

impl<S, C> Drop for StreamTransport<S, C> {
    fn drop(&mut self) {
        let reader = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = reader.as_ref() {
            task.abort();
        }
    }
}

async fn read_loop<S, F>(
    store: S,
    config: TransportConfig,
    sent: Arc<Mutex<SentLog>>,
    running: Arc<AtomicBool>,
    positioned: Arc<watch::Sender<bool>>,
    on_event: F,
) where
    S: Store,
    F: Fn(Envelope),
{
    let stream = config.stream.as_str();
    let tail = store.last_id(stream).await;
    positioned.send_replace(true);
    let mut cursor = match tail {
        Ok(tail) => ReadFrom::After(tail.unwrap_or_default()),
        Err(e) => {
            tracing::error!(stream, error = %e, "wake reader stopped");
            running.store(false, Ordering::SeqCst);
            return;
        }
    };
    tracing::trace!(stream, cursor = %cursor, "reader positioned");

    loop {
        let entries = match store
            .read_blocking(stream, &cursor, config.block_timeout, config.batch_size)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(stream, error = %e, "wake reader stopped");
                running.store(false, Ordering::SeqCst);
                return;
            }
        };

        for entry in entries {
            cursor = ReadFrom::After(entry.id);
            tracing::trace!(stream, entry_id = %entry.id, "cursor advanced");

            let Some(envelope) = Envelope::from_entry(&entry) else {
                tracing::warn!(stream, entry_id = %entry.id, "skipping malformed wake entry");
                continue;
            };
            let echo = sent_log(&sent).take_echo(&envelope, entry.id);
            if echo {
                tracing::trace!(stream, entry_id = %entry.id, "own wake event");
                continue;
            }
            on_event(envelope);
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
