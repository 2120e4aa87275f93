//! Settings command - account settings and local preferences.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use serde_json::json;
use tracing::info;
use versesync_core::UiLanguage;

use super::emit;
use crate::Cli;

/// Arguments for the settings command.
#[derive(Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub action: SettingsAction,
}

/// Settings subcommands.
#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show account settings and local preferences.
    Show,

    /// Allow or refuse storing chat transcripts.
    StoreMessages {
        /// true or false.
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },

    /// Set the UI language (ko or en).
    Language {
        /// Language tag.
        language: String,
    },
}

/// Runs the settings command.
pub async fn run(args: &SettingsArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;

    match &args.action {
        SettingsAction::Show => {
            let prefs = client.preferences().get().await;
            let account = if client.session().state().is_signed_in() {
                Some(client.library().settings().await?)
            } else {
                None
            };
            let value = json!({
                "account": account,
                "uiLanguage": prefs.ui_language,
                "storeMessages": prefs.storage_consent.store_messages,
                "readingPosition": prefs.reading_position.as_ref().map(|p| p.key().to_string()),
            });
            emit(cli, &value, |f| {
                let mut lines = vec![
                    f.bold("Settings"),
                    "─".repeat(40),
                    format!("UI language:      {}", prefs.ui_language),
                    format!("Store messages:   {}", prefs.storage_consent.store_messages),
                ];
                if let Some(position) = &prefs.reading_position {
                    lines.push(format!("Reading position: {}", position.key()));
                }
                match &account {
                    Some(account) => lines.push(format!(
                        "Account stores:   {}",
                        account.store_messages
                    )),
                    None => lines.push(f.dim("Sign in to see account settings")),
                }
                lines.join("\n")
            })
        }
        SettingsAction::StoreMessages { enabled } => {
            if client.session().state().is_signed_in() {
                client.library().update_settings(*enabled).await?;
            }
            let changed = client.set_storage_consent(*enabled).await?;
            info!(store_messages = *enabled, changed, "Storage consent updated");
            emit(cli, &json!({"storeMessages": enabled, "changed": changed}), |f| {
                if changed {
                    format!("Store messages set to {enabled}")
                } else {
                    f.dim("Unchanged")
                }
            })
        }
        SettingsAction::Language { language } => {
            let language: UiLanguage = language.parse().map_err(|e: String| anyhow!(e))?;
            client.preferences().set_ui_language(language).await?;
            emit(cli, &json!({"uiLanguage": language}), |_| {
                format!("UI language set to {language}")
            })
        }
    }
}
