//! Cache command - inspect and clear cached chapters.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;
use tracing::info;

use super::emit;
use crate::Cli;

/// Arguments for the cache command.
#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands.
#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached chapters, most recently used first.
    List,
    /// Remove every cached chapter.
    Clear,
}

/// Runs the cache command.
pub async fn run(args: &CacheArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;
    let cache = client.content().cache();

    match args.action {
        CacheAction::List => {
            let keys = cache.keys_by_recency().await;
            emit(cli, &keys, |f| {
                if keys.is_empty() {
                    return f.dim("Cache is empty");
                }
                let mut lines: Vec<String> = keys.iter().map(ToString::to_string).collect();
                lines.push(f.dim(&format!("{}/{} chapters", keys.len(), cache.capacity())));
                lines.join("\n")
            })
        }
        CacheAction::Clear => {
            let removed = client.clear_cache().await?;
            info!(removed, "Cache cleared");
            emit(cli, &json!({"removed": removed}), |_| {
                format!("Removed {removed} cached chapter(s)")
            })
        }
    }
}
