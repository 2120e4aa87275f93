// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `VerseSync` CLI - scripture reading, search, and chat from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Sign in
//! versesync auth login reader@example.com
//!
//! # Read a chapter (cache first, then refresh)
//! versesync read krv 43 3
//!
//! # Continue where you left off
//! versesync read
//!
//! # Search
//! versesync search krv "사랑" --limit 20
//!
//! # Chat (interactive when no message is given)
//! versesync chat "What does John 3:16 mean?"
//!
//! # JSON output
//! versesync --format json --pretty status
//!
//! # Throwaway state
//! versesync --ephemeral read krv 1 1
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use versesync_store::{ClientConfig, KeyValueStore, MemoryStore};
use versesync_sync::SyncClient;

use commands::{auth, cache, chat, config, library, read, search, settings, status};

// ============================================================================
// CLI Definition
// ============================================================================

/// `VerseSync` CLI - scripture reading and chat.
#[derive(Parser)]
#[command(name = "versesync")]
#[command(about = "Scripture reading, search, and chat CLI")]
#[command(long_about = r#"
VerseSync reads scripture through a local chapter cache, keeps your
bookmarks and memos in sync, and talks to the chat assistant.

Examples:
  versesync auth login you@example.com   # Sign in
  versesync read krv 43 3                # Read John 3 (Korean Revised)
  versesync read                         # Reopen the last chapter
  versesync search krv "사랑"            # Full-text search
  versesync chat                         # Interactive chat
  versesync status                       # Session, quota, cache
"#)]
#[command(version)]
#[command(author = "VerseSync Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// API base URL, overriding the config file and environment.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Keep all state in memory for this run only.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, register, sign out.
    #[command(visible_alias = "a")]
    Auth(auth::AuthArgs),

    /// Read a chapter.
    #[command(visible_alias = "r")]
    Read(read::ReadArgs),

    /// List the books of a version.
    Books(read::BooksArgs),

    /// Full-text search.
    #[command(visible_alias = "s")]
    Search(search::SearchArgs),

    /// Chat with the assistant.
    #[command(visible_alias = "c")]
    Chat(chat::ChatArgs),

    /// Manage bookmarks.
    #[command(visible_alias = "b")]
    Bookmarks(library::BookmarkArgs),

    /// Manage verse memos.
    #[command(visible_alias = "m")]
    Memos(library::MemoArgs),

    /// Account and local settings.
    Settings(settings::SettingsArgs),

    /// Show session, quota, and cache state.
    Status,

    /// Manage the chapter cache.
    Cache(cache::CacheArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Not signed in, or the session could not be renewed.
    Unauthorized = 2,
    /// A usage limit was reached.
    QuotaExceeded = 3,
    /// The server could not be reached.
    Network = 4,
}

impl ExitCode {
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<versesync_core::SyncError>() {
            Some(versesync_core::SyncError::Unauthorized(_)) => Self::Unauthorized,
            Some(versesync_core::SyncError::QuotaExceeded { .. }) => Self::QuotaExceeded,
            Some(versesync_core::SyncError::Network(_)) => Self::Network,
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Client Setup
// ============================================================================

impl Cli {
    /// Loads configuration with command-line overrides applied.
    pub fn config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load()?;
        config.apply_env_overrides(self.api_url.clone());
        Ok(config)
    }

    /// Opens the client, over memory when `--ephemeral` is set.
    pub async fn client(&self) -> Result<SyncClient> {
        let config = self.config()?;
        let client = if self.ephemeral {
            let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
            SyncClient::open_with_store(config, store).await?
        } else {
            SyncClient::open(config).await?
        };
        Ok(client)
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("versesync=debug,info")
    } else {
        EnvFilter::new("versesync=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Auth(args) => auth::run(args, &cli).await,
        Commands::Read(args) => read::run(args, &cli).await,
        Commands::Books(args) => read::run_books(args, &cli).await,
        Commands::Search(args) => search::run(args, &cli).await,
        Commands::Chat(args) => chat::run(args, &cli).await,
        Commands::Bookmarks(args) => library::run_bookmarks(args, &cli).await,
        Commands::Memos(args) => library::run_memos(args, &cli).await,
        Commands::Settings(args) => settings::run(args, &cli).await,
        Commands::Status => status::run(&cli).await,
        Commands::Cache(args) => cache::run(args, &cli).await,
        Commands::Config(args) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    std::process::exit(ExitCode::Success as i32);
}
