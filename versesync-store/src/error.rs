//! Store error types.

use thiserror::Error;
use versesync_core::SyncError;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted record exists but does not decode.
    #[error("Corrupt record at {key}: {reason}")]
    Corrupt {
        /// Storage key.
        key: String,
        /// Decode failure.
        reason: String,
    },

    /// Keychain access failed.
    #[error("Keychain error: {0}")]
    Keychain(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns true if the record is unreadable rather than the store.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. })
    }
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        StoreError::Keychain(err.to_string())
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Storage(err.to_string())
    }
}
