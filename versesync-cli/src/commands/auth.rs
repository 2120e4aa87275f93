//! Auth command - sign in, register, OAuth, sign out.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use versesync_core::{AuthError, CredentialPair, SyncError};

use super::emit;
use crate::Cli;

/// Arguments for the auth command.
#[derive(Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Auth subcommands.
#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in with email and password.
    Login {
        /// Account email.
        email: String,
        /// Password. Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
        /// Captcha token, once the server asks for one.
        #[arg(long)]
        captcha: Option<String>,
    },

    /// Create an account and sign in.
    Register {
        /// Account email.
        email: String,
        /// Password. Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Start or finish an OAuth sign-in.
    Oauth {
        #[command(subcommand)]
        step: OAuthStep,
    },

    /// Renew the access token now.
    Refresh,

    /// Sign out and forget stored credentials.
    Logout,
}

/// OAuth steps.
#[derive(Subcommand)]
pub enum OAuthStep {
    /// Print the authorization URL to open in a browser.
    Start,
    /// Exchange the code from the redirect.
    Complete {
        /// `code` query parameter of the redirect.
        code: String,
        /// `state` query parameter of the redirect.
        state: String,
    },
}

/// Runs the auth command.
pub async fn run(args: &AuthArgs, cli: &Cli) -> Result<()> {
    let client = cli.client().await?;
    let session = client.session();

    let signed_in = match &args.action {
        AuthAction::Login {
            email,
            password,
            captcha,
        } => {
            let password = password_or_stdin(password.as_deref()).await?;
            let result = session.login(email, &password, captcha.as_deref()).await;
            Some(explain_login(result)?)
        }
        AuthAction::Register { email, password } => {
            let password = password_or_stdin(password.as_deref()).await?;
            Some(session.register(email, &password).await?)
        }
        AuthAction::Oauth {
            step: OAuthStep::Start,
        } => {
            let start = session.start_oauth().await?;
            let value = json!({
                "authorizationUrl": start.authorization_url,
                "state": start.state,
            });
            return emit(cli, &value, |f| {
                format!(
                    "Open this URL to continue:\n  {}\n\nThen run:\n  versesync auth oauth complete <code> {}",
                    f.bold(&start.authorization_url),
                    start.state
                )
            });
        }
        AuthAction::Oauth {
            step: OAuthStep::Complete { code, state },
        } => Some(session.complete_oauth(code, state).await?),
        AuthAction::Refresh => Some(session.refresh().await?),
        AuthAction::Logout => {
            client.logout().await?;
            info!("Signed out");
            None
        }
    };

    match signed_in {
        Some(pair) => report_signed_in(cli, &pair),
        None => emit(cli, &json!({"signedIn": false}), |f| f.dim("Signed out")),
    }
}

fn report_signed_in(cli: &Cli, pair: &CredentialPair) -> Result<()> {
    let value = json!({
        "signedIn": true,
        "userId": pair.user_id,
        "email": pair.email,
        "expiresAt": pair.expires_at.map(|t| t.to_rfc3339()),
    });
    emit(cli, &value, |f| {
        let who = pair.email.as_deref().unwrap_or(&pair.user_id);
        format!("Signed in as {}", f.green(who))
    })
}

/// Adds a next step to throttling errors.
fn explain_login(result: Result<CredentialPair, SyncError>) -> Result<CredentialPair> {
    match result {
        Ok(pair) => Ok(pair),
        Err(e @ SyncError::Auth(AuthError::CaptchaRequired)) => {
            Err(e).context("solve the captcha and retry with --captcha <token>")
        }
        Err(e @ SyncError::Auth(AuthError::LoginBlocked { .. })) => {
            Err(e).context("too many failed attempts")
        }
        Err(e) => Err(e.into()),
    }
}

async fn password_or_stdin(password: Option<&str>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password.to_string());
    }
    eprint!("Password: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("password required");
    }
    Ok(password)
}
