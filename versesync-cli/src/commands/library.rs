//! Bookmark and memo commands.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;
use versesync_core::VerseRef;

use super::emit;
use crate::Cli;

/// A verse given on the command line.
#[derive(Args, Debug, Clone)]
pub struct VerseArgs {
    /// Translation identifier.
    pub version: String,
    /// Book number.
    pub book: u32,
    /// Chapter number.
    pub chapter: u32,
    /// Verse number.
    pub verse: u32,
}

impl From<&VerseArgs> for VerseRef {
    fn from(args: &VerseArgs) -> Self {
        VerseRef::new(args.version.clone(), args.book, args.chapter, args.verse)
    }
}

// ============================================================================
// Bookmarks
// ============================================================================

/// Arguments for the bookmarks command.
#[derive(Args)]
pub struct BookmarkArgs {
    #[command(subcommand)]
    pub action: BookmarkAction,
}

/// Bookmark subcommands.
#[derive(Subcommand)]
pub enum BookmarkAction {
    /// List bookmarks of a version.
    List {
        /// Translation identifier.
        version: String,
    },
    /// Bookmark a verse.
    Add(VerseArgs),
    /// Remove a bookmark.
    Remove(VerseArgs),
}

/// Runs the bookmarks command.
pub async fn run_bookmarks(args: &BookmarkArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;
    let library = client.library();

    match &args.action {
        BookmarkAction::List { version } => {
            let bookmarks = library.bookmarks(version).await?;
            emit(cli, &bookmarks, |f| f.format_bookmarks(&bookmarks))
        }
        BookmarkAction::Add(verse) => {
            let created = library.add_bookmark(&verse.into()).await?;
            emit(cli, &json!({"created": created}), |f| {
                if created {
                    f.green("Bookmarked")
                } else {
                    f.dim("Already bookmarked")
                }
            })
        }
        BookmarkAction::Remove(verse) => {
            let deleted = library.remove_bookmark(&verse.into()).await?;
            emit(cli, &json!({"deleted": deleted}), |f| removed(f, deleted))
        }
    }
}

// ============================================================================
// Memos
// ============================================================================

/// Arguments for the memos command.
#[derive(Args)]
pub struct MemoArgs {
    #[command(subcommand)]
    pub action: MemoAction,
}

/// Memo subcommands.
#[derive(Subcommand)]
pub enum MemoAction {
    /// List memos of a version.
    List {
        /// Translation identifier.
        version: String,
    },
    /// Write or replace the memo on a verse.
    Save {
        #[command(flatten)]
        verse: VerseArgs,
        /// Memo text.
        #[arg(long, short)]
        text: String,
    },
    /// Delete the memo on a verse.
    Delete(VerseArgs),
}

/// Runs the memos command.
pub async fn run_memos(args: &MemoArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;
    let library = client.library();

    match &args.action {
        MemoAction::List { version } => {
            let memos = library.memos(version).await?;
            emit(cli, &memos, |f| f.format_memos(&memos))
        }
        MemoAction::Save { verse, text } => {
            let saved = library.save_memo(&verse.into(), text).await?;
            emit(cli, &json!({"saved": saved}), |f| f.green("Memo saved"))
        }
        MemoAction::Delete(verse) => {
            let deleted = library.delete_memo(&verse.into()).await?;
            emit(cli, &json!({"deleted": deleted}), |f| removed(f, deleted))
        }
    }
}

fn removed(f: &crate::output::TextFormatter, deleted: bool) -> String {
    if deleted {
        f.green("Removed")
    } else {
        f.dim("Nothing to remove")
    }
}
