// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kvl run <name> -- <command>...` - Run a command while holding a lock

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use kvl_core::Settings;
use kvl_lock::{
    BaseLock, DistributedLock, Interrupt, InterruptingLock, NotificationLock, PoolScheduler,
    WakeRegistry,
};
use kvl_store::Store;
use std::process::{ExitCode, ExitStatus};
use std::time::Duration;

/// Exit code when `--wait` elapsed without acquiring the lock
pub const WAIT_ELAPSED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Retry the store at a fixed interval
    Poll,
    /// Park until another process releases the lock
    Notify,
    /// Enforce the lease; kill the command when it overruns
    Watchdog,
}

#[derive(Args)]
pub struct RunArgs {
    /// Lock name
    pub name: String,

    /// Lease after which the lock is freed (e.g. "30s")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub lease: Option<Duration>,

    /// Give up if the lock is not acquired within this time
    #[arg(long, value_parser = humantime::parse_duration)]
    pub wait: Option<Duration>,

    /// How to wait for and hold the lock
    #[arg(long, value_enum, default_value_t = Mode::Poll)]
    pub mode: Mode,

    /// Command and its arguments
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

pub async fn run<S: Store>(store: S, settings: &Settings, args: RunArgs) -> Result<ExitCode> {
    let base = BaseLock::builder(store.clone(), args.name.as_str())
        .config(&settings.lock);
    let base = match args.lease {
        Some(lease) => base.lease(lease),
        None => base,
    }
    .build()?;
    let token = base.token().to_string();

    let lock: Box<dyn DistributedLock> = match args.mode {
        Mode::Poll => Box::new(base),
        Mode::Notify => {
            let registry = WakeRegistry::new(store, settings.transport.clone())?;
            Box::new(NotificationLock::new(base, registry, &settings.lock)?)
        }
        Mode::Watchdog => Box::new(InterruptingLock::new(
            base,
            PoolScheduler::current()?,
            settings.watchdog.clone(),
        )?),
    };

    let interrupt = lock.interrupt().clone();
    let ctrl_c = tokio::spawn({
        let interrupt = interrupt.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.interrupt();
            }
        }
    });

    let acquired = match args.wait {
        Some(wait) => lock.try_lock_for(wait).await?,
        None => lock.lock_interruptibly().await.map(|_| true)?,
    };
    if !acquired {
        ctrl_c.abort();
        eprintln!("kvl: timed out waiting for lock {}", args.name);
        return Ok(ExitCode::from(WAIT_ELAPSED));
    }
    tracing::debug!(lock = %args.name, %token, mode = ?args.mode, "lock acquired");

    let outcome = supervise(&interrupt, &args.name, &token, &args.command).await;
    ctrl_c.abort();
    lock.unlock().await?;

    match outcome? {
        Some(status) => Ok(exit_code(status)),
        None => bail!("lock {} was interrupted; command killed", args.name),
    }
}

/// Run the command to completion, or kill it when the holder is interrupted
///
/// Returns `None` when the command was killed.
async fn supervise(
    interrupt: &Interrupt,
    name: &str,
    token: &str,
    command: &[String],
) -> Result<Option<ExitStatus>> {
    let Some((program, rest)) = command.split_first() else {
        bail!("no command given");
    };
    let mut child = tokio::process::Command::new(program)
        .args(rest)
        .env("KVL_LOCK", name)
        .env("KVL_TOKEN", token)
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;

    tokio::select! {
        status = child.wait() => Ok(Some(status?)),
        _ = interrupt.interrupted() => {
            tracing::warn!(lock = name, program = %program, "holder interrupted, killing command");
            child.kill().await?;
            Ok(None)
        }
    }
}

fn exit_code(status: ExitStatus) -> ExitCode {
    status
        .code()
        .and_then(|code| u8::try_from(code).ok())
        .map_or(ExitCode::FAILURE, ExitCode::from)
}
