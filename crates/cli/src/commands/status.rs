// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kvl status <name>` - Show who holds a lock

use crate::output::{self, LockStatus, OutputFormat};
use anyhow::Result;
use clap::Args;
use kvl_store::Store;

#[derive(Args)]
pub struct StatusArgs {
    /// Lock name
    pub name: String,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub async fn status<S: Store>(store: S, args: StatusArgs) -> Result<()> {
    let token = store.get(&args.name).await?;
    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    output::print(&LockStatus::new(args.name, token), format);
    Ok(())
}
