//! Read command - open a chapter cache first, then refresh it.

use anyhow::Result;
use clap::Args;
use tracing::debug;
use versesync_core::ChapterKey;

use super::emit;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the read command.
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Translation identifier (e.g. krv). Reopens the last chapter when
    /// omitted together with book and chapter.
    pub version: Option<String>,

    /// Book number (1-66).
    pub book: Option<u32>,

    /// Chapter number.
    pub chapter: Option<u32>,
}

/// Arguments for the books command.
#[derive(Args, Debug)]
pub struct BooksArgs {
    /// Translation identifier. Defaults to the UI language's version.
    pub version: Option<String>,
}

/// Runs the read command.
pub async fn run(args: &ReadArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;

    let key = match (&args.version, args.book, args.chapter) {
        (Some(version), Some(book), Some(chapter)) => {
            ChapterKey::new(version.clone(), book, chapter)
        }
        (None, None, None) => match client.preferences().reading_position().await {
            Some(position) => position.key(),
            None => {
                let version = client.preferences().ui_language().await.default_version();
                ChapterKey::new(version, 1, 1)
            }
        },
        _ => anyhow::bail!("give a version, book, and chapter, or none of them"),
    };
    debug!(%key, "Opening chapter");

    let (cached, outcome) = client.open_chapter(&key).await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if let Some(entry) = outcome.entry().or(cached.as_ref()) {
                println!("{}", formatter.format_chapter(entry));
            }
            if !cli.quiet {
                eprintln!("{}", formatter.format_outcome(&outcome));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output = formatter.chapter_output(&key, cached.as_ref(), &outcome);
            println!("{}", formatter.format(&output)?);
        }
    }

    Ok(())
}

/// Runs the books command.
pub async fn run_books(args: &BooksArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;
    let version = match &args.version {
        Some(v) => v.clone(),
        None => client
            .preferences()
            .ui_language()
            .await
            .default_version()
            .to_string(),
    };

    let books = client.library().books(&version).await?;
    emit(cli, &books, |f| f.format_books(&books))
}
