//! Persisted credential pair.
//!
//! The pair is written and cleared as one record, so a refresh token is
//! never left behind without the access token it was issued with.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use versesync_core::CredentialPair;

use crate::error::StoreError;
use crate::keychain::KeychainApi;
use crate::kv::{KeyValueStore, get_typed, keys, set_typed};

/// Where the credential pair is kept.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the stored pair. An unreadable record reads as absent.
    async fn load(&self) -> Result<Option<CredentialPair>, StoreError>;

    /// Replaces the stored pair.
    async fn save(&self, creds: &CredentialPair) -> Result<(), StoreError>;

    /// Removes the stored pair.
    async fn clear(&self) -> Result<(), StoreError>;
}

// ============================================================================
// Key-Value Backend
// ============================================================================

/// Keeps the pair at `session:credentials` in the shared store.
pub struct KvCredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvCredentialStore {
    /// Creates a credential store over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CredentialStore for KvCredentialStore {
    async fn load(&self) -> Result<Option<CredentialPair>, StoreError> {
        match get_typed(self.store.as_ref(), keys::SESSION_CREDENTIALS).await {
            Err(e) if e.is_corrupt() => {
                warn!(error = %e, "Stored credentials unreadable, discarding");
                self.store.remove(keys::SESSION_CREDENTIALS).await?;
                Ok(None)
            }
            other => other,
        }
    }

    async fn save(&self, creds: &CredentialPair) -> Result<(), StoreError> {
        debug!(user_id = %creds.user_id, "Saving credentials");
        set_typed(self.store.as_ref(), keys::SESSION_CREDENTIALS, creds).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        debug!("Clearing credentials");
        self.store.remove(keys::SESSION_CREDENTIALS).await
    }
}

// ============================================================================
// Keychain Backend
// ============================================================================

const KEYCHAIN_SERVICE: &str = "session";
const KEYCHAIN_ACCOUNT: &str = "credentials";

/// Keeps the pair as one JSON secret in the system keychain.
pub struct KeychainCredentialStore {
    keychain: Arc<dyn KeychainApi>,
}

impl KeychainCredentialStore {
    /// Creates a credential store over `keychain`.
    pub fn new(keychain: Arc<dyn KeychainApi>) -> Self {
        Self { keychain }
    }
}

#[async_trait]
impl CredentialStore for KeychainCredentialStore {
    async fn load(&self) -> Result<Option<CredentialPair>, StoreError> {
        let Some(secret) = self.keychain.get(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&secret) {
            Ok(creds) => Ok(Some(creds)),
            Err(e) => {
                warn!(error = %e, "Keychain credentials unreadable, discarding");
                self.keychain.delete(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT).await?;
                Ok(None)
            }
        }
    }

    async fn save(&self, creds: &CredentialPair) -> Result<(), StoreError> {
        let secret = serde_json::to_string(creds)?;
        self.keychain
            .set(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT, &secret)
            .await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.keychain.delete(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct FakeKeychain {
        secrets: Mutex<HashMap<(String, String), String>>,
    }

    #[async_trait]
    impl KeychainApi for FakeKeychain {
        async fn get(&self, service: &str, account: &str) -> Result<Option<String>, StoreError> {
            Ok(self
                .secrets
                .lock()
                .await
                .get(&(service.to_string(), account.to_string()))
                .cloned())
        }

        async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), StoreError> {
            self.secrets
                .lock()
                .await
                .insert((service.to_string(), account.to_string()), secret.to_string());
            Ok(())
        }

        async fn delete(&self, service: &str, account: &str) -> Result<(), StoreError> {
            self.secrets
                .lock()
                .await
                .remove(&(service.to_string(), account.to_string()));
            Ok(())
        }
    }

    fn pair(n: u32) -> CredentialPair {
        CredentialPair {
            access_token: format!("access-{n}"),
            refresh_token: Some(format!("refresh-{n}")),
            user_id: "u1".into(),
            email: Some("reader@example.com".into()),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_kv_save_replaces_whole_pair() {
        let store = KvCredentialStore::new(Arc::new(MemoryStore::new()));
        assert!(store.load().await.unwrap().is_none());

        store.save(&pair(1)).await.unwrap();
        store.save(&pair(2)).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-2");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh-2"));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_kv_corrupt_record_reads_absent() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(keys::SESSION_CREDENTIALS, json!({"access_token": "only"}))
            .await
            .unwrap();
        let store = KvCredentialStore::new(kv.clone());
        assert!(store.load().await.unwrap().is_none());
        assert!(kv.get(keys::SESSION_CREDENTIALS).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keychain_backend_roundtrip() {
        let keychain = Arc::new(FakeKeychain::default());
        let store = KeychainCredentialStore::new(keychain.clone());
        store.save(&pair(7)).await.unwrap();
        assert_eq!(store.load().await.unwrap().unwrap(), pair(7));

        keychain
            .set(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT, "not json")
            .await
            .unwrap();
        assert!(store.load().await.unwrap().is_none());
        assert!(keychain.get(KEYCHAIN_SERVICE, KEYCHAIN_ACCOUNT).await.unwrap().is_none());
    }
}
