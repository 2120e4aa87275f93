//! Client configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::content_cache::DEFAULT_CACHE_CAPACITY;
use crate::error::StoreError;
use crate::persistence::{default_config_path, default_data_dir, state_path};

/// Environment variable overriding [`ClientConfig::api_base_url`].
pub const API_URL_ENV: &str = "VERSESYNC_API_URL";

/// Where the credential pair is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// In the shared state file.
    #[default]
    File,
    /// In the system keychain.
    Keychain,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL every API path is relative to.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Maximum number of cached chapters.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Redirect URI registered for the OAuth client.
    #[serde(default = "default_oauth_redirect_uri")]
    pub oauth_redirect_uri: String,
    /// Locale sent when creating conversations. Falls back to the UI
    /// language preference when absent.
    #[serde(default)]
    pub locale: Option<String>,
    /// Stable device identifier sent with conversation creation.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Credential storage backend.
    #[serde(default)]
    pub credential_backend: CredentialBackend,
    /// Directory holding persisted state. Platform data dir when absent.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "http://localhost:9000/v1".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_oauth_redirect_uri() -> String {
    "versesync://oauth/callback".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            cache_capacity: default_cache_capacity(),
            oauth_redirect_uri: default_oauth_redirect_uri(),
            locale: None,
            device_id: None,
            credential_backend: CredentialBackend::default(),
            data_dir: None,
        }
    }
}

impl ClientConfig {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        default_config_path()
    }

    /// Loads configuration from the default path, then applies environment
    /// overrides.
    pub fn load() -> Result<Self, StoreError> {
        let mut config = Self::load_from(&Self::default_path())?;
        config.apply_env_overrides(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Loads configuration from a specific path. A missing file yields
    /// defaults.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&content)
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Applies an `api_base_url` override, ignoring blank values.
    pub fn apply_env_overrides(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            debug!(url = %url, "API URL overridden from environment");
            self.api_base_url = url.trim().to_string();
        }
    }

    /// Directory holding persisted state.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Path of the persisted state file.
    pub fn state_path(&self) -> PathBuf {
        state_path(&self.data_dir())
    }

    /// Saves configuration to a specific path.
    pub async fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        crate::persistence::save_json(path, self).await?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:9000/v1");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.cache_capacity, 200);
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"cache_capacity": 50, "credential_backend": "keychain"}"#,
        )
        .unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.cache_capacity, 50);
        assert_eq!(config.credential_backend, CredentialBackend::Keychain);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            ClientConfig::load_from(&path),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_env_override() {
        let mut config = ClientConfig::default();
        config.apply_env_overrides(Some("  ".into()));
        assert_eq!(config.api_base_url, "http://localhost:9000/v1");
        config.apply_env_overrides(Some("https://api.example.org/v1".into()));
        assert_eq!(config.api_base_url, "https://api.example.org/v1");
    }

    #[test]
    fn test_state_path_under_data_dir() {
        let config = ClientConfig {
            data_dir: Some(PathBuf::from("/var/lib/vs")),
            ..ClientConfig::default()
        };
        assert_eq!(config.state_path(), PathBuf::from("/var/lib/vs/state.json"));
    }
}
