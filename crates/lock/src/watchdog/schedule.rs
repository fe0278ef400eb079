// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed, cancellable task execution for the watchdog
//!
//! Dropping a [`ScheduledTask`] detaches it; only [`ScheduledTask::cancel`]
//! stops it, before or while it runs.

use crate::error::LockError;
use crate::interrupt::Interrupt;
use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// The routine a scheduler runs once its delay elapses
pub type ExpiryTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs a task after a delay unless cancelled first
pub trait TaskScheduler: Clone + Send + Sync + 'static {
    fn schedule(
        &self,
        label: &str,
        delay: Duration,
        task: ExpiryTask,
    ) -> Result<ScheduledTask, LockError>;
}

enum Cancel {
    Thread {
        wake: mpsc::Sender<()>,
        stop: Interrupt,
    },
    Abort(AbortHandle),
}

/// Handle to a scheduled task
pub struct ScheduledTask {
    cancel: Cancel,
}

impl ScheduledTask {
    /// Stop the task; one already running is dropped at its next await
    pub fn cancel(self) {
        match self.cancel {
            Cancel::Thread { wake, stop } => {
                stop.interrupt();
                // The thread may already have exited
                let _ = wake.send(());
            }
            Cancel::Abort(handle) => handle.abort(),
        }
    }
}

/// One named OS thread per scheduled task
///
/// The thread waits on a cancellation channel with the delay as timeout, then
/// drives the task on the runtime `handle` until it finishes or is cancelled.
/// Tasks due after the runtime has shut down are dropped with a warning.
#[derive(Clone)]
pub struct DedicatedScheduler {
    handle: Handle,
    runtime: watch::Receiver<()>,
}

impl DedicatedScheduler {
    pub fn new(handle: Handle) -> Self {
        // The sender lives in a task that never finishes, so the channel
        // closes exactly when the runtime drops its tasks on shutdown
        let (alive, runtime) = watch::channel(());
        handle.spawn(async move {
            let _alive = alive;
            std::future::pending::<()>().await;
        });
        Self { handle, runtime }
    }

    /// Scheduler for the runtime this is called from
    pub fn current() -> Result<Self, LockError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| LockError::config("dedicated scheduler needs a tokio runtime"))
    }
}

impl TaskScheduler for DedicatedScheduler {
    fn schedule(
        &self,
        label: &str,
        delay: Duration,
        task: ExpiryTask,
    ) -> Result<ScheduledTask, LockError> {
        let (wake, rx) = mpsc::channel();
        let stop = Interrupt::new();
        let handle = self.handle.clone();
        let mut runtime = self.runtime.clone();
        let deadline = Instant::now() + delay;
        let label = label.to_string();
        let thread_stop = stop.clone();

        std::thread::Builder::new()
            .name(format!("kvl-watchdog-{label}"))
            .spawn(move || {
                match rx.recv_timeout(delay) {
                    Ok(()) => return,
                    Err(RecvTimeoutError::Timeout) => {}
                    // Detached: wait out the rest of the delay
                    Err(RecvTimeoutError::Disconnected) => {
                        std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    }
                }
                if thread_stop.is_interrupted() {
                    return;
                }
                if runtime.has_changed().is_err() {
                    tracing::warn!(label = %label, "runtime shut down, watchdog task dropped");
                    return;
                }
                handle.block_on(async move {
                    tokio::select! {
                        biased;
                        _ = runtime.changed() => {
                            tracing::warn!(
                                label = %label,
                                "runtime shut down, watchdog task dropped"
                            );
                        }
                        () = thread_stop.interrupted() => {
                            tracing::trace!(label = %label, "watchdog task cancelled");
                        }
                        () = task => {}
                    }
                });
            })
            .map_err(LockError::Watchdog)?;

        Ok(ScheduledTask {
            cancel: Cancel::Thread { wake, stop },
        })
    }
}

/// Tasks on a shared tokio runtime
///
/// Liveness depends on the runtime having a free worker when the delay
/// elapses; a pool whose workers are all blocked cannot enforce leases.
#[derive(Clone)]
pub struct PoolScheduler {
    handle: Handle,
}

impl PoolScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    pub fn current() -> Result<Self, LockError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| LockError::config("pool scheduler needs a tokio runtime"))
    }
}

impl TaskScheduler for PoolScheduler {
    fn schedule(
        &self,
        label: &str,
        delay: Duration,
        task: ExpiryTask,
    ) -> Result<ScheduledTask, LockError> {
        tracing::trace!(label, delay_ms = delay.as_millis() as u64, "scheduling on pool");
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        Ok(ScheduledTask {
            cancel: Cancel::Abort(join.abort_handle()),
        })
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
