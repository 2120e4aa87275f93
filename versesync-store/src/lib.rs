// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `VerseSync` Store
//!
//! Persisted client state for `VerseSync`.
//!
//! This crate provides:
//!
//! - **KeyValueStore**: The shared persisted key space (JSON file or memory)
//! - **ContentCache**: Bounded LRU chapter cache
//! - **CredentialStore**: The credential pair, in the state file or keychain
//! - **Preferences**: Reading position, UI language, storage consent
//! - **ClientConfig**: Configuration with defaults and env overrides
//!
//! ## Usage
//!
//! ```ignore
//! use versesync_store::{ContentCache, JsonFileStore, ClientConfig};
//!
//! let config = ClientConfig::load()?;
//! let store = Arc::new(JsonFileStore::open(&config.state_path()).await?);
//! let cache = ContentCache::open(store.clone(), config.cache_capacity).await?;
//!
//! if let Some(entry) = cache.get(&ChapterKey::new("krv", 1, 1)).await? {
//!     println!("{} verses cached", entry.verses.len());
//! }
//! ```

pub mod config;
pub mod content_cache;
pub mod credential_store;
pub mod error;
pub mod keychain;
pub mod kv;
pub mod persistence;
pub mod preferences;

pub use config::{API_URL_ENV, ClientConfig, CredentialBackend};
pub use content_cache::{ContentCache, DEFAULT_CACHE_CAPACITY};
pub use credential_store::{CredentialStore, KeychainCredentialStore, KvCredentialStore};
pub use error::StoreError;
pub use keychain::{KeychainApi, SystemKeychain};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore, get_typed, keys, set_typed};
pub use persistence::{
    default_config_dir, default_config_path, default_data_dir, ensure_dir, load_json,
    load_json_or_default, save_json, state_path,
};
pub use preferences::{PreferenceValues, Preferences};
