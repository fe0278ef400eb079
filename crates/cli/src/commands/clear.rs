// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kvl clear <name>` - Force-delete a lock key

use anyhow::Result;
use clap::Args;
use kvl_store::Store;

#[derive(Args)]
pub struct ClearArgs {
    /// Lock name
    pub name: String,
}

/// Delete the key whoever holds it. The holder is not told.
pub async fn clear<S: Store>(store: S, args: ClearArgs) -> Result<()> {
    let holder = store.get(&args.name).await?;
    if store.del(&args.name).await? {
        tracing::warn!(
            lock = %args.name,
            token = holder.as_deref().unwrap_or("-"),
            "lock key force-deleted"
        );
        println!("{}: cleared", args.name);
    } else {
        println!("{}: not held", args.name);
    }
    Ok(())
}
