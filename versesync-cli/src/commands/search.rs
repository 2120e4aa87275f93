//! Search command.

use anyhow::Result;
use clap::Args;
use versesync_sync::DEFAULT_SEARCH_LIMIT;

use super::emit;
use crate::Cli;

/// Arguments for the search command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Translation identifier.
    pub version: String,

    /// Words to search for.
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Results per page (1-100).
    #[arg(long, short, default_value_t = DEFAULT_SEARCH_LIMIT)]
    pub limit: u32,

    /// Results to skip.
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

/// Runs the search command.
pub async fn run(args: &SearchArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;
    let query = args.query.join(" ");

    let results = client
        .library()
        .search(&args.version, &query, Some(args.limit), args.offset)
        .await?;

    emit(cli, &results, |f| f.format_search(&results, args.offset))
}
