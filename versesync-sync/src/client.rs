//! The client facade.
//!
//! [`SyncClient`] is built once at startup from a [`ClientConfig`] and owns
//! every component. All of them share one persisted key-value space, each
//! in its own namespace.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use versesync_core::{CacheEntry, ChapterKey, ReadingPosition, StorageConsent, SyncError};
use versesync_fetch::{HttpTransport, Transport};
use versesync_store::{
    ClientConfig, ContentCache, CredentialBackend, CredentialStore, JsonFileStore,
    KeyValueStore, KeychainCredentialStore, KvCredentialStore, Preferences, SystemKeychain,
};

use crate::chat::ChatSession;
use crate::content::{ContentSync, RefreshOutcome};
use crate::gateway::RequestGateway;
use crate::library::Library;
use crate::quota::QuotaReconciler;
use crate::session::SessionManager;

/// Owns the whole client state.
pub struct SyncClient {
    config: ClientConfig,
    store: Arc<dyn KeyValueStore>,
    session: Arc<SessionManager>,
    gateway: Arc<RequestGateway>,
    content: Arc<ContentSync>,
    quota: Arc<QuotaReconciler>,
    chat: Arc<ChatSession>,
    library: Arc<Library>,
    preferences: Arc<Preferences>,
}

impl SyncClient {
    /// Opens the persisted state named by `config` and connects to its API.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be opened or the base URL
    /// is invalid.
    #[instrument(skip(config), fields(api = %config.api_base_url))]
    pub async fn open(config: ClientConfig) -> Result<Self, SyncError> {
        let store: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileStore::open(&config.state_path()).await?);
        Self::open_with_store(config, store).await
    }

    /// Like [`SyncClient::open`], but over an existing key-value store.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or persisted state
    /// cannot be read.
    pub async fn open_with_store(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, SyncError> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        )?);
        let credentials: Arc<dyn CredentialStore> = match config.credential_backend {
            CredentialBackend::File => Arc::new(KvCredentialStore::new(store.clone())),
            CredentialBackend::Keychain => {
                Arc::new(KeychainCredentialStore::new(Arc::new(SystemKeychain::new())))
            }
        };
        Self::with_parts(config, store, transport, credentials).await
    }

    /// Assembles a client from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if persisted state cannot be read.
    pub async fn with_parts(
        config: ClientConfig,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, SyncError> {
        let session = Arc::new(
            SessionManager::open(
                transport.clone(),
                credentials,
                store.clone(),
                config.oauth_redirect_uri.clone(),
                config.device_id.clone(),
            )
            .await?,
        );
        let gateway = Arc::new(RequestGateway::new(transport, session.clone()));
        let cache = Arc::new(ContentCache::open(store.clone(), config.cache_capacity).await?);
        let preferences = Arc::new(Preferences::open(store.clone()).await?);
        let quota = Arc::new(QuotaReconciler::new());
        let chat = Arc::new(ChatSession::new(
            gateway.clone(),
            quota.clone(),
            preferences.clone(),
            session.subscribe(),
            config.locale.clone(),
            config.device_id.clone(),
        ));

        info!(
            signed_in = session.state().is_signed_in(),
            cached = cache.len().await,
            "Client ready"
        );
        Ok(Self {
            content: Arc::new(ContentSync::new(gateway.clone(), cache)),
            library: Arc::new(Library::new(gateway.clone())),
            config,
            store,
            session,
            gateway,
            quota,
            chat,
            preferences,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The shared persisted key-value space.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Sign-in flows and credential state.
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Authorized request path.
    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    /// Chapter loading.
    pub fn content(&self) -> &Arc<ContentSync> {
        &self.content
    }

    /// Latest quota report.
    pub fn quota(&self) -> &Arc<QuotaReconciler> {
        &self.quota
    }

    /// Chat conversation.
    pub fn chat(&self) -> &Arc<ChatSession> {
        &self.chat
    }

    /// Books, search, bookmarks, memos, settings.
    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    /// Local preferences.
    pub fn preferences(&self) -> &Arc<Preferences> {
        &self.preferences
    }

    /// Opens a chapter: records it as the reading position, returns the
    /// cached copy, and waits for the refresh.
    ///
    /// # Errors
    ///
    /// Returns the refresh error when nothing was cached to fall back on.
    pub async fn open_chapter(
        &self,
        key: &ChapterKey,
    ) -> Result<(Option<CacheEntry>, RefreshOutcome), SyncError> {
        self.preferences
            .set_reading_position(ReadingPosition::from(key))
            .await?;
        let (cached, refresh) = self.content.load(key.clone()).await?;
        let outcome = refresh.await?;
        Ok((cached, outcome))
    }

    /// Updates storage consent. A change drops the open conversation so the
    /// next message starts one under the new consent.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the preference cannot be written.
    pub async fn set_storage_consent(&self, store_messages: bool) -> Result<bool, SyncError> {
        let changed = self
            .preferences
            .set_storage_consent(StorageConsent { store_messages })
            .await?;
        if changed {
            self.chat.reset().await;
        }
        Ok(changed)
    }

    /// Signs out and drops the open conversation.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the stored credentials cannot be
    /// removed.
    pub async fn logout(&self) -> Result<(), SyncError> {
        self.session.logout().await?;
        self.chat.reset().await;
        Ok(())
    }

    /// Removes every cached chapter. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the store cannot be written.
    pub async fn clear_cache(&self) -> Result<usize, SyncError> {
        Ok(self.content.cache().clear().await?)
    }
}
