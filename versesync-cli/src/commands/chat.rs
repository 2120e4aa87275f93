//! Chat command - one message, or an interactive session over stdin.

use anyhow::Result;
use clap::Args;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use versesync_core::{ChatReply, SyncError};
use versesync_sync::{ChatSession, QuotaReconciler};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the chat command.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Message to send. Starts an interactive session when omitted.
    pub message: Vec<String>,

    /// Show the quota after each reply.
    #[arg(long)]
    pub show_quota: bool,
}

/// Runs the chat command.
pub async fn run(args: &ChatArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;
    let chat = client.chat();
    let quota = client.quota();

    if !args.message.is_empty() {
        let reply = send_once(chat, &args.message.join(" ")).await?;
        return print_reply(cli, &reply, quota, args.show_quota);
    }

    if !cli.quiet {
        eprintln!("Type a message and press enter. /quota shows usage, /new starts over.");
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "/quota" => {
                print_quota(cli, quota)?;
                continue;
            }
            "/new" => {
                chat.reset().await;
                continue;
            }
            _ => {}
        }

        match send_once(chat, line).await {
            Ok(reply) => print_reply(cli, &reply, quota, args.show_quota)?,
            Err(e @ (SyncError::QuotaExceeded { .. } | SyncError::Validation { .. })) => {
                let formatter = TextFormatter::new(!cli.no_color);
                eprintln!("{}", formatter.format_error("chat", &e.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Sends a message, reopening the conversation once if the server expired it.
async fn send_once(chat: &ChatSession, message: &str) -> Result<ChatReply, SyncError> {
    match chat.send(message).await {
        Err(SyncError::SessionExpired) => {
            warn!("Conversation expired, starting a new one");
            chat.send(message).await
        }
        other => other,
    }
}

fn print_reply(
    cli: &Cli,
    reply: &ChatReply,
    quota: &QuotaReconciler,
    show_quota: bool,
) -> Result<()> {
    debug!(citations = reply.citations.len(), "Reply received");
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_reply(reply));
            if show_quota {
                println!("{}", formatter.format_quota(&quota.snapshot()));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output = json!({
                "reply": reply,
                "quota": formatter.quota_output(&quota.snapshot()),
            });
            println!("{}", formatter.format(&output)?);
        }
    }
    Ok(())
}

fn print_quota(cli: &Cli, quota: &QuotaReconciler) -> Result<()> {
    let snapshot = quota.snapshot();
    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_quota(&snapshot));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&formatter.quota_output(&snapshot))?);
        }
    }
    Ok(())
}
