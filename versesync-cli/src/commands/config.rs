//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;
use versesync_store::{ClientConfig, CredentialBackend, default_config_dir};

use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set the API base URL.
    ApiUrl {
        /// Base URL, e.g. `https://api.example.com/v1`.
        url: String,
    },

    /// Choose where credentials are stored (file or keychain).
    Credentials {
        /// Backend: file, keychain.
        backend: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli),
        ConfigAction::Path => show_paths(cli),
        ConfigAction::ApiUrl { url } => set_api_url(url).await,
        ConfigAction::Credentials { backend } => set_credentials(backend).await,
        ConfigAction::Reset => reset_config().await,
    }
}

fn show_config(cli: &Cli) -> Result<()> {
    let config = cli.config()?;

    match cli.format {
        OutputFormat::Text => {
            println!("VerseSync Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("API base URL:     {}", config.api_base_url);
            println!("Request timeout:  {}s", config.request_timeout_secs);
            println!("Cache capacity:   {} chapters", config.cache_capacity);
            println!("OAuth redirect:   {}", config.oauth_redirect_uri);
            println!(
                "Locale:           {}",
                config.locale.as_deref().unwrap_or("(UI language)")
            );
            println!(
                "Device ID:        {}",
                config.device_id.as_deref().unwrap_or("(none)")
            );
            println!("Credentials:      {:?}", config.credential_backend);
            println!("Data dir:         {}", config.data_dir().display());
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&config)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config = cli.config()?;
    let config_dir = default_config_dir();
    let config_file = ClientConfig::default_path();
    let state_file = config.state_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:  {}", config_dir.display());
            println!("Config file: {}", config_file.display());
            println!("State file:  {}", state_file.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "config_file": config_file.display().to_string(),
                "state_file": state_file.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

/// Loads the file as written, without environment overrides.
fn load_file() -> Result<ClientConfig> {
    Ok(ClientConfig::load_from(&ClientConfig::default_path())?)
}

async fn set_api_url(url: &str) -> Result<()> {
    let parsed = url.trim();
    if !(parsed.starts_with("http://") || parsed.starts_with("https://")) {
        anyhow::bail!("API URL must start with http:// or https://: {url}");
    }

    let mut config = load_file()?;
    config.api_base_url = parsed.trim_end_matches('/').to_string();
    config.save_to(&ClientConfig::default_path()).await?;

    info!(url = %config.api_base_url, "API URL updated");
    println!("API URL set to: {}", config.api_base_url);
    Ok(())
}

async fn set_credentials(backend: &str) -> Result<()> {
    let backend = match backend.to_lowercase().as_str() {
        "file" => CredentialBackend::File,
        "keychain" => CredentialBackend::Keychain,
        _ => anyhow::bail!("Unknown credential backend: {backend}. Use: file, keychain"),
    };

    let mut config = load_file()?;
    config.credential_backend = backend;
    config.save_to(&ClientConfig::default_path()).await?;

    info!(?backend, "Credential backend updated");
    println!("Credentials stored in: {backend:?}");
    Ok(())
}

async fn reset_config() -> Result<()> {
    let path = ClientConfig::default_path();

    if path.exists() {
        tokio::fs::remove_file(&path).await?;
        info!(path = %path.display(), "Configuration reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}
