// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kvl - run commands under a distributed lock

mod backend;
mod commands;
mod logging;
mod output;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{clear, run, status};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "kvl",
    version,
    about = "kvlock - distributed locks over a shared key-value store"
)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store URL, overriding the settings file (redis://host:port or memory://)
    #[arg(long, global = true, env = "KVL_STORE")]
    store: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command while holding a lock
    Run(run::RunArgs),
    /// Show who holds a lock
    Status(status::StatusArgs),
    /// Force-delete a stuck lock key
    Clear(clear::ClearArgs),
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = logging::setup(cli.log_file.as_deref())?;

    let settings = settings::resolve(cli.config.as_deref(), cli.store)?;
    let backend = backend::connect(&settings.store.url).await?;
    tracing::debug!(url = %settings.store.url, "store ready");

    match cli.command {
        Commands::Run(args) => {
            backend::dispatch!(backend, store => run::run(store, &settings, args).await)
        }
        Commands::Status(args) => {
            backend::dispatch!(backend, store => status::status(store, args).await)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Clear(args) => {
            backend::dispatch!(backend, store => clear::clear(store, args).await)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
