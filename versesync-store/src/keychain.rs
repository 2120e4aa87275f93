//! Secure credential storage using the system keychain.
//!
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Service name prefix for VerseSync credentials.
const SERVICE_PREFIX: &str = "versesync";

// ============================================================================
// Keychain API Trait
// ============================================================================

/// API for secure secret storage.
#[async_trait]
pub trait KeychainApi: Send + Sync {
    /// Reads a secret. `Ok(None)` when nothing is stored.
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, StoreError>;

    /// Stores a secret, replacing any previous one.
    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError>;

    /// Deletes a secret. Deleting a missing secret is not an error.
    async fn delete(&self, service: &str, account: &str) -> Result<(), StoreError>;
}

// ============================================================================
// System Keychain Implementation
// ============================================================================

/// Implementation over the platform keychain via `keyring`.
#[derive(Debug, Clone, Default)]
pub struct SystemKeychain;

impl SystemKeychain {
    /// Creates a new system keychain instance.
    pub fn new() -> Self {
        Self
    }

    /// Builds the full service name with prefix.
    fn full_service(service: &str) -> String {
        format!("{SERVICE_PREFIX}:{service}")
    }

    fn entry(service: &str, account: &str) -> Result<Entry, StoreError> {
        Entry::new(&Self::full_service(service), account).map_err(StoreError::from)
    }
}

#[async_trait]
impl KeychainApi for SystemKeychain {
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, StoreError> {
        debug!(service = %service, account = %account, "Getting secret from keychain");

        match Self::entry(service, account)?.get_password() {
            Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
            Ok(_) | Err(keyring::Error::NoEntry) => {
                debug!(service = %service, account = %account, "Secret not found");
                Ok(None)
            }
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "Failed to get secret");
                Err(e.into())
            }
        }
    }

    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError> {
        debug!(service = %service, account = %account, "Storing secret in keychain");

        Self::entry(service, account)?
            .set_password(secret)
            .map_err(|e| {
                warn!(service = %service, account = %account, error = %e, "Failed to store secret");
                StoreError::from(e)
            })
    }

    async fn delete(&self, service: &str, account: &str) -> Result<(), StoreError> {
        debug!(service = %service, account = %account, "Deleting secret from keychain");

        match Self::entry(service, account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "Failed to delete secret");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_service_prefix() {
        assert_eq!(SystemKeychain::full_service("session"), "versesync:session");
    }
}
