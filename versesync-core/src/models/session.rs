//! Session and credential types.
//!
//! - [`CredentialPair`] - Access/refresh tokens plus identity
//! - [`PkceHandshakeState`] - Pending OAuth handshake
//! - [`SessionState`] - Externally observable sign-in state
//! - [`LoginThrottle`] - Client view of server login throttling

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Credential Pair
// ============================================================================

/// Credentials of a signed-in user, as returned by every auth endpoint.
///
/// The pair is stored whole and cleared whole, so a refresh token never
/// outlives its access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    /// Short-lived bearer token.
    #[serde(alias = "session_token")]
    pub access_token: String,
    /// Single-use rotating refresh token, if the server issued one.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Account identifier.
    pub user_id: String,
    /// Account email.
    #[serde(default)]
    pub email: Option<String>,
    /// Access token expiry as reported by the server.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialPair {
    /// Returns true if a refresh token is held.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Returns true if the server-reported expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp <= Utc::now())
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// ============================================================================
// PKCE Handshake
// ============================================================================

/// Lifetime of a pending OAuth handshake.
pub const OAUTH_STATE_TTL_SECS: i64 = 600;

/// A pending OAuth handshake, keyed by its `state` nonce.
#[derive(Clone, Serialize, Deserialize)]
pub struct PkceHandshakeState {
    /// Opaque state nonce issued by the server.
    pub state: String,
    /// Secret verifier the challenge was derived from.
    pub code_verifier: String,
    /// When the handshake was started.
    pub created_at: DateTime<Utc>,
}

impl PkceHandshakeState {
    /// Creates a handshake record stamped now.
    pub fn new(state: impl Into<String>, code_verifier: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            code_verifier: code_verifier.into(),
            created_at: Utc::now(),
        }
    }

    /// Returns true once the handshake is older than [`OAUTH_STATE_TTL_SECS`].
    pub fn is_expired(&self) -> bool {
        Utc::now() - self.created_at >= Duration::seconds(OAUTH_STATE_TTL_SECS)
    }
}

impl std::fmt::Debug for PkceHandshakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceHandshakeState")
            .field("state", &self.state)
            .field("code_verifier", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Externally observable sign-in state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No credentials held.
    #[default]
    SignedOut,
    /// A credential pair is held.
    SignedIn {
        /// Account identifier.
        user_id: String,
        /// Account email.
        email: Option<String>,
    },
}

impl SessionState {
    /// Derives the state from an optional credential pair.
    pub fn from_credentials(creds: Option<&CredentialPair>) -> Self {
        match creds {
            Some(c) => Self::SignedIn {
                user_id: c.user_id.clone(),
                email: c.email.clone(),
            },
            None => Self::SignedOut,
        }
    }

    /// Returns true when signed in.
    pub fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }
}

// ============================================================================
// Login Throttle
// ============================================================================

/// The client's view of login throttling, updated only from server responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginThrottle {
    /// Consecutive rejected attempts since the last success.
    pub consecutive_failures: u32,
    /// Whether the server last demanded a captcha.
    pub captcha_required: bool,
    /// Seconds the server asked us to wait, if blocked.
    pub retry_after_secs: Option<u64>,
}
