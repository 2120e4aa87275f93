//! The shared persisted key-value space.
//!
//! Every component owns a disjoint key namespace (see [`keys`]). Values are
//! stored as JSON so that a record that no longer decodes can be detected
//! and dropped by its owner instead of poisoning the whole store.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};

/// Key namespaces.
pub mod keys {
    /// Content cache recency index.
    pub const CACHE_INDEX: &str = "cache:index";
    /// Prefix of content cache entries, followed by `{version}:{book}:{chapter}`.
    pub const CACHE_ENTRY_PREFIX: &str = "cache:entry:";
    /// Persisted credential pair.
    pub const SESSION_CREDENTIALS: &str = "session:credentials";
    /// Prefix of pending OAuth handshakes, followed by the state nonce.
    pub const SESSION_PKCE_PREFIX: &str = "session:pkce:";
    /// Last reading position.
    pub const PREFS_READING_POSITION: &str = "prefs:reading_position";
    /// UI language.
    pub const PREFS_UI_LANGUAGE: &str = "prefs:ui_language";
    /// Storage consent.
    pub const PREFS_STORAGE_CONSENT: &str = "prefs:storage_consent";
}

// ============================================================================
// Trait
// ============================================================================

/// A persisted string-keyed JSON value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Writes a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removes a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Lists keys starting with `prefix`, in sorted order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Reads and decodes a value.
///
/// # Errors
///
/// Returns `StoreError::Corrupt` if the value exists but has the wrong shape.
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match store.get(key).await? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

/// Encodes and writes a value.
///
/// # Errors
///
/// Returns an error if encoding or the write fails.
pub async fn set_typed<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    store.set(key, serde_json::to_value(value)?).await
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Volatile store, used for tests and `--ephemeral` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

// ============================================================================
// JSON File Store
// ============================================================================

/// Store backed by one JSON file, flushed on every mutation.
///
/// The whole map is rewritten atomically on each write; the write lock is
/// held across the flush so concurrent mutations serialize.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store; an
    /// unreadable one is logged and replaced on the next write.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let entries = if path.exists() {
            match load_json::<BTreeMap<String, Value>>(path).await {
                Ok(map) => map,
                Err(StoreError::Serialization(e)) => {
                    warn!(error = %e, "State file unreadable, starting empty");
                    BTreeMap::new()
                }
                Err(e) => return Err(e),
            }
        } else {
            BTreeMap::new()
        };
        debug!(keys = entries.len(), "Opened state file");

        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        save_json(&self.path, &*entries).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            save_json(&self.path, &*entries).await?;
        }
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
