//! Session management.
//!
//! Owns the credential pair and every flow that creates, rotates, or drops
//! it: email/password login and registration, the PKCE OAuth handshake,
//! refresh, and logout. Externally the session is either signed out or
//! signed in; a rotation swaps the pair in one step.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, instrument, warn};
use url::Url;
use versesync_core::{
    AuthError, CredentialPair, LoginThrottle, PkceHandshakeState, SessionState, SyncError,
};
use versesync_fetch::{ApiRequest, ApiResponse, Transport, endpoints};
use versesync_store::{CredentialStore, KeyValueStore, get_typed, keys, set_typed};

use crate::pkce::{CHALLENGE_METHOD, PkcePair};

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 12;
/// Longest accepted password, in characters.
pub const MAX_PASSWORD_CHARS: usize = 128;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid regex"));

static RETRY_AFTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry after (\d+)\s*s").expect("Invalid regex"));

// ============================================================================
// Input Validation
// ============================================================================

/// Trims and lower-cases `email`, then checks its shape.
///
/// # Errors
///
/// Returns `SyncError::Validation` for a malformed address.
pub fn normalize_email(email: &str) -> Result<String, SyncError> {
    let email = email.trim().to_lowercase();
    if EMAIL_RE.is_match(&email) {
        Ok(email)
    } else {
        Err(SyncError::Validation {
            message: "invalid email".to_string(),
            details: Vec::new(),
        })
    }
}

/// Checks a new password against the length rules.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` when the password is too short or too
/// long.
pub fn check_password(password: &str) -> Result<(), AuthError> {
    let chars = password.chars().count();
    if chars < MIN_PASSWORD_CHARS {
        Err(AuthError::WeakPassword("password too short".to_string()))
    } else if chars > MAX_PASSWORD_CHARS {
        Err(AuthError::WeakPassword("password too long".to_string()))
    } else {
        Ok(())
    }
}

fn retry_after_from(response: &ApiResponse) -> u64 {
    response.retry_after_secs.unwrap_or_else(|| {
        RETRY_AFTER_RE
            .captures(&response.error_message())
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    })
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    captcha_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<&'a str>,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<&'a str>,
}

#[derive(Serialize)]
struct OAuthStartBody<'a> {
    code_challenge: &'a str,
    code_challenge_method: &'a str,
    redirect_uri: &'a str,
}

#[derive(Deserialize)]
struct OAuthStartReply {
    #[serde(alias = "auth_url")]
    authorization_url: String,
    state: String,
}

#[derive(Serialize)]
struct OAuthExchangeBody<'a> {
    code: &'a str,
    state: &'a str,
    code_verifier: &'a str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

/// Where to send the user to continue an OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthStart {
    /// Provider authorization URL.
    pub authorization_url: String,
    /// State nonce the callback must carry back.
    pub state: String,
}

// ============================================================================
// Session Manager
// ============================================================================

/// Owns the credential pair and the sign-in state machine.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialStore>,
    store: Arc<dyn KeyValueStore>,
    current: RwLock<Option<CredentialPair>>,
    /// Held across the refresh call so concurrent 401s rotate once.
    refresh_lock: Mutex<()>,
    /// Serializes handshake lookup and removal.
    oauth_lock: Mutex<()>,
    state: watch::Sender<SessionState>,
    throttle: Mutex<LoginThrottle>,
    redirect_uri: String,
    device_id: Option<String>,
}

impl SessionManager {
    /// Restores the session from the credential store.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the credential store cannot be read.
    pub async fn open(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        store: Arc<dyn KeyValueStore>,
        redirect_uri: impl Into<String>,
        device_id: Option<String>,
    ) -> Result<Self, SyncError> {
        let current = credentials.load().await?;
        let initial = SessionState::from_credentials(current.as_ref());
        debug!(signed_in = initial.is_signed_in(), "Session restored");

        let (state, _) = watch::channel(initial);
        Ok(Self {
            transport,
            credentials,
            store,
            current: RwLock::new(current),
            refresh_lock: Mutex::new(()),
            oauth_lock: Mutex::new(()),
            state,
            throttle: Mutex::new(LoginThrottle::default()),
            redirect_uri: redirect_uri.into(),
            device_id,
        })
    }

    /// Current sign-in state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribes to sign-in state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// The credential pair currently held, if any.
    pub async fn credentials(&self) -> Option<CredentialPair> {
        self.current.read().await.clone()
    }

    /// Client view of login throttling.
    pub async fn login_throttle(&self) -> LoginThrottle {
        self.throttle.lock().await.clone()
    }

    // ------------------------------------------------------------------------
    // Email & Password
    // ------------------------------------------------------------------------

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidCredentials` on a rejected pair
    /// - `AuthError::CaptchaRequired` when the server wants a captcha token
    /// - `AuthError::LoginBlocked` while the server throttles attempts
    /// - `SyncError::Validation` for a malformed email
    /// - `SyncError::Network` on transport failure
    #[instrument(skip(self, email, password, captcha_token))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        captcha_token: Option<&str>,
    ) -> Result<CredentialPair, SyncError> {
        let email = normalize_email(email)?;
        let request = ApiRequest::post(endpoints::AUTH_LOGIN).with_json(&LoginBody {
            email: &email,
            password,
            captcha_token,
            device_id: self.device_id.as_deref(),
        })?;
        let response = self.transport.send(request).await?;

        if response.is_success() {
            let pair = auth_reply(&response, &email)?;
            *self.throttle.lock().await = LoginThrottle::default();
            return self.sign_in(pair).await;
        }

        let mut throttle = self.throttle.lock().await;
        match response.status {
            401 => {
                throttle.consecutive_failures += 1;
                throttle.retry_after_secs = None;
                debug!(failures = throttle.consecutive_failures, "Login rejected");
                Err(AuthError::InvalidCredentials.into())
            }
            403 if response.error_message().to_lowercase().contains("captcha") => {
                throttle.consecutive_failures += 1;
                throttle.captcha_required = true;
                info!(failures = throttle.consecutive_failures, "Server requires captcha for login");
                Err(AuthError::CaptchaRequired.into())
            }
            429 => {
                let retry_after_secs = retry_after_from(&response);
                throttle.retry_after_secs = Some(retry_after_secs);
                warn!(retry_after_secs, "Login temporarily blocked");
                Err(AuthError::LoginBlocked { retry_after_secs }.into())
            }
            _ => Err(response.into_error()),
        }
    }

    /// Creates an account and signs in.
    ///
    /// # Errors
    ///
    /// - `AuthError::EmailTaken` when the email already has an account
    /// - `AuthError::WeakPassword` when the password breaks the length rules
    /// - `SyncError::Validation` for a malformed email
    #[instrument(skip(self, email, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<CredentialPair, SyncError> {
        let email = normalize_email(email)?;
        check_password(password)?;

        let request = ApiRequest::post(endpoints::AUTH_REGISTER).with_json(&RegisterBody {
            email: &email,
            password,
            device_id: self.device_id.as_deref(),
        })?;
        let response = self.transport.send(request).await?;

        if response.is_success() {
            let pair = auth_reply(&response, &email)?;
            return self.sign_in(pair).await;
        }

        let message = response.error_message();
        match response.status {
            409 => Err(AuthError::EmailTaken.into()),
            400 if message.contains("password") => Err(AuthError::WeakPassword(message).into()),
            400 if message.contains("email") => Err(SyncError::Validation {
                message,
                details: Vec::new(),
            }),
            _ => Err(response.into_error()),
        }
    }

    // ------------------------------------------------------------------------
    // OAuth (PKCE)
    // ------------------------------------------------------------------------

    /// Starts an OAuth sign-in and records the verifier under the returned
    /// state.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses the handshake, returns an
    /// unusable authorization URL, or the handshake cannot be persisted.
    #[instrument(skip(self))]
    pub async fn start_oauth(&self) -> Result<OAuthStart, SyncError> {
        let pkce = PkcePair::generate()?;
        let request = ApiRequest::post(endpoints::OAUTH_START).with_json(&OAuthStartBody {
            code_challenge: &pkce.code_challenge,
            code_challenge_method: CHALLENGE_METHOD,
            redirect_uri: &self.redirect_uri,
        })?;
        let reply: OAuthStartReply = self.transport.send(request).await?.into_result()?;

        Url::parse(&reply.authorization_url).map_err(|e| {
            SyncError::InvalidResponse(format!("authorization url {}: {e}", reply.authorization_url))
        })?;
        if reply.state.is_empty() {
            return Err(SyncError::InvalidResponse("empty oauth state".to_string()));
        }

        let _guard = self.oauth_lock.lock().await;
        self.prune_handshakes().await?;
        let handshake = PkceHandshakeState::new(reply.state.clone(), pkce.code_verifier);
        set_typed(self.store.as_ref(), &handshake_key(&reply.state), &handshake).await?;
        debug!(state = %reply.state, "OAuth handshake started");

        Ok(OAuthStart {
            authorization_url: reply.authorization_url,
            state: reply.state,
        })
    }

    /// Completes an OAuth sign-in from the callback's `code` and `state`.
    ///
    /// The handshake is consumed before the exchange, so a state can be
    /// used at most once.
    ///
    /// # Errors
    ///
    /// - `AuthError::StateMismatch` when no live handshake matches `state`
    /// - `AuthError::ExchangeFailed` when the server rejects the code
    #[instrument(skip(self, code))]
    pub async fn complete_oauth(&self, code: &str, state: &str) -> Result<CredentialPair, SyncError> {
        let handshake = self.take_handshake(state).await?;
        let Some(handshake) = handshake.filter(|h| h.state == state && !h.is_expired()) else {
            warn!("OAuth callback without a live handshake");
            return Err(AuthError::StateMismatch.into());
        };

        let request = ApiRequest::post(endpoints::OAUTH_EXCHANGE).with_json(&OAuthExchangeBody {
            code,
            state,
            code_verifier: &handshake.code_verifier,
            redirect_uri: &self.redirect_uri,
        })?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(AuthError::ExchangeFailed(response.error_message()).into());
        }

        let pair: CredentialPair = response
            .json()
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;
        self.sign_in(pair).await
    }

    async fn take_handshake(&self, state: &str) -> Result<Option<PkceHandshakeState>, SyncError> {
        let _guard = self.oauth_lock.lock().await;
        let key = handshake_key(state);
        let handshake = match get_typed::<PkceHandshakeState>(self.store.as_ref(), &key).await {
            Ok(found) => found,
            Err(e) if e.is_corrupt() => {
                warn!(error = %e, "Unreadable OAuth handshake");
                None
            }
            Err(e) => return Err(e.into()),
        };
        self.store.remove(&key).await?;
        Ok(handshake)
    }

    async fn prune_handshakes(&self) -> Result<(), SyncError> {
        for key in self.store.keys_with_prefix(keys::SESSION_PKCE_PREFIX).await? {
            let stale = match get_typed::<PkceHandshakeState>(self.store.as_ref(), &key).await {
                Ok(Some(h)) => h.is_expired(),
                Ok(None) => false,
                Err(e) if e.is_corrupt() => true,
                Err(e) => return Err(e.into()),
            };
            if stale {
                debug!(%key, "Dropping stale OAuth handshake");
                self.store.remove(&key).await?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Refresh & Logout
    // ------------------------------------------------------------------------

    /// Rotates the credential pair.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when no refresh token is held or the
    /// server rejects it. Holding no refresh token leaves the session as it
    /// is; a rejected or failed refresh call signs the session out.
    pub async fn refresh(&self) -> Result<CredentialPair, SyncError> {
        let observed = self
            .current
            .read()
            .await
            .as_ref()
            .and_then(|c| c.refresh_token.clone());
        self.refresh_after_unauthorized(observed.as_deref()).await
    }

    /// Rotates the pair unless the refresh token the caller saw has already
    /// been rotated by someone else, in which case the newer pair is reused.
    #[instrument(skip(self, observed))]
    pub(crate) async fn refresh_after_unauthorized(
        &self,
        observed: Option<&str>,
    ) -> Result<CredentialPair, SyncError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(current) = self.current.read().await.clone() else {
            return Err(SyncError::Unauthorized("not signed in".to_string()));
        };
        if current.refresh_token.as_deref() != observed {
            debug!("Refresh token already rotated, reusing current pair");
            return Ok(current);
        }
        let Some(refresh_token) = current.refresh_token.clone().filter(|t| !t.is_empty()) else {
            return Err(SyncError::Unauthorized("no refresh token".to_string()));
        };

        let request =
            ApiRequest::post(endpoints::AUTH_REFRESH).with_json(&RefreshBody {
                refresh_token: &refresh_token,
            })?;
        let rotated = match self.transport.send(request).await {
            Ok(response) if response.is_success() => response.json::<CredentialPair>(),
            Ok(response) => Err(SyncError::Unauthorized(response.error_message())),
            Err(e) => Err(e.into()),
        };

        let mut pair = match rotated {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "Refresh failed, signing out");
                self.sign_out_local().await;
                return Err(e);
            }
        };
        if pair.email.is_none() {
            pair.email = current.email;
        }

        if let Err(e) = self.credentials.save(&pair).await {
            warn!(error = %e, "Could not persist rotated credentials, signing out");
            self.sign_out_local().await;
            return Err(e.into());
        }
        *self.current.write().await = Some(pair.clone());
        info!(user_id = %pair.user_id, "Credentials rotated");
        Ok(pair)
    }

    /// Revokes the session server-side (best effort) and forgets the pair.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the stored pair cannot be removed.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), SyncError> {
        if let Some(creds) = self.credentials().await {
            let request = ApiRequest::post(endpoints::AUTH_LOGOUT).with_bearer(creds.access_token);
            match self.transport.send(request).await {
                Ok(response) if response.is_success() => debug!("Server session revoked"),
                Ok(response) => warn!(status = response.status, "Logout rejected by server"),
                Err(e) => warn!(error = %e, "Logout request failed"),
            }
        }

        *self.current.write().await = None;
        self.publish(SessionState::SignedOut);
        info!("Signed out");
        self.credentials.clear().await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // State Transitions
    // ------------------------------------------------------------------------

    async fn sign_in(&self, pair: CredentialPair) -> Result<CredentialPair, SyncError> {
        self.credentials.save(&pair).await?;
        *self.current.write().await = Some(pair.clone());
        self.publish(SessionState::from_credentials(Some(&pair)));
        info!(user_id = %pair.user_id, "Signed in");
        Ok(pair)
    }

    async fn sign_out_local(&self) {
        *self.current.write().await = None;
        if let Err(e) = self.credentials.clear().await {
            warn!(error = %e, "Could not clear stored credentials");
        }
        self.publish(SessionState::SignedOut);
        info!("Signed out");
    }

    fn publish(&self, next: SessionState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}

fn handshake_key(state: &str) -> String {
    format!("{}{state}", keys::SESSION_PKCE_PREFIX)
}

fn auth_reply(response: &ApiResponse, email: &str) -> Result<CredentialPair, SyncError> {
    let mut pair: CredentialPair = response.json()?;
    if pair.email.is_none() {
        pair.email = Some(email.to_string());
    }
    Ok(pair)
}
