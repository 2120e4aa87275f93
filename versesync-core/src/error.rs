//! Error taxonomy for VerseSync.
//!
//! Every failure a caller can observe is one of the [`SyncError`] variants.
//! Transport and storage crates convert their own errors into this type at
//! their boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::QuotaKind;

/// Authentication failures surfaced to the user. Never retried silently.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Email/password pair was rejected.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Registration refused because the email already has an account.
    #[error("Email is already registered")]
    EmailTaken,

    /// Password does not satisfy the server's strength rules.
    #[error("Password rejected: {0}")]
    WeakPassword(String),

    /// The server demands a captcha token after repeated failures.
    #[error("Captcha required")]
    CaptchaRequired,

    /// Login is temporarily blocked after repeated failures.
    #[error("Login temporarily blocked, retry after {retry_after_secs}s")]
    LoginBlocked {
        /// Seconds until the server accepts another attempt.
        retry_after_secs: u64,
    },

    /// OAuth callback carried a `state` with no pending handshake.
    #[error("OAuth state does not match any pending sign-in")]
    StateMismatch,

    /// The authorization code could not be exchanged for credentials.
    #[error("OAuth code exchange failed: {0}")]
    ExchangeFailed(String),
}

/// Uniform error type for every client operation.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// Transport failure or timeout. Recoverable via cache fallback or retry.
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A 401 that survived the single refresh-and-retry.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The conversation session expired (410) and must be recreated.
    #[error("Conversation session expired")]
    SessionExpired,

    /// A usage limit was hit (429).
    #[error("{kind} limit reached: {message}")]
    QuotaExceeded {
        /// Which limit was hit.
        kind: QuotaKind,
        /// Server-provided message.
        message: String,
    },

    /// Request rejected as invalid. Details are surfaced verbatim.
    #[error("Validation error: {message}")]
    Validation {
        /// Server-provided message.
        message: String,
        /// Structured details from the error envelope.
        details: Vec<serde_json::Value>,
    },

    /// Any other non-success response.
    #[error("HTTP {status} ({code}): {message}")]
    Http {
        /// Status code.
        status: u16,
        /// Error code from the envelope.
        code: String,
        /// Error message from the envelope.
        message: String,
    },

    /// Response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Persisted storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SyncError {
    /// Returns true for failures that a cached copy can paper over.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns the HTTP status this error was derived from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::SessionExpired => Some(410),
            Self::QuotaExceeded { .. } => Some(429),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::InvalidResponse(e.to_string())
    }
}

/// Wire shape of the server's error body.
///
/// `{"error":{"code":string,"message":string,"details"?:array}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error payload.
    pub error: ErrorBody,
}

/// Inner error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details (validation errors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}
