//! Status command - session, quota, preferences, and cache at a glance.

use anyhow::Result;
use versesync_store::PreferenceValues;
use versesync_sync::SyncClient;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the status command.
pub async fn run(cli: &Cli) -> Result<()> {
    let client = cli.client().await?;

    let state = client.session().state();
    let throttle = client.session().login_throttle().await;
    let quota = client.quota().snapshot();
    let prefs = client.preferences().get().await;
    let cached = client.content().cache().len().await;

    match cli.format {
        OutputFormat::Text => {
            let f = TextFormatter::new(!cli.no_color);
            println!("{}", f.bold("VerseSync Status"));
            println!("{}", "─".repeat(40));
            println!("{:<8} {}", "API:", client.config().api_base_url);
            println!("{}", f.format_session(&state, &throttle));
            println!("{}", f.format_quota(&quota));
            println!("{}", format_local(&f, &client, &prefs, cached));
        }
        OutputFormat::Json => {
            let f = JsonFormatter::new(cli.pretty);
            let output = f.status_output(
                &client.config().api_base_url,
                f.session_output(&state, &throttle),
                f.quota_output(&quota),
                &prefs,
                cached,
                client.content().cache().capacity(),
            );
            println!("{}", f.format(&output)?);
        }
    }

    Ok(())
}

fn format_local(
    f: &TextFormatter,
    client: &SyncClient,
    prefs: &PreferenceValues,
    cached: usize,
) -> String {
    let mut lines = vec![format!(
        "{:<8} {}/{} chapters",
        "Cache:",
        cached,
        client.content().cache().capacity()
    )];
    match &prefs.reading_position {
        Some(position) => lines.push(format!("{:<8} {}", "Last:", position.key())),
        None => lines.push(format!("{:<8} {}", "Last:", f.dim("nothing read yet"))),
    }
    lines.push(format!(
        "{:<8} {}, store messages {}",
        "Prefs:", prefs.ui_language, prefs.storage_consent.store_messages
    ));
    lines.join("\n")
}
