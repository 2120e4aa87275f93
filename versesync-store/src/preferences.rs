//! Local preferences: reading position, UI language, storage consent.
//!
//! Values live in the `prefs:` namespace and are loaded once at open; every
//! setter writes through and bumps a version on a watch channel.

use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};
use versesync_core::{ReadingPosition, StorageConsent, UiLanguage};

use crate::error::StoreError;
use crate::kv::{KeyValueStore, get_typed, keys, set_typed};

/// Snapshot of all preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceValues {
    /// Last chapter opened.
    pub reading_position: Option<ReadingPosition>,
    /// UI language.
    pub ui_language: UiLanguage,
    /// Storage consent.
    pub storage_consent: StorageConsent,
}

/// Preferences store with change notification.
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    values: RwLock<PreferenceValues>,
    notify: watch::Sender<u64>,
}

impl Preferences {
    /// Loads preferences from `store`. Unreadable values fall back to their
    /// defaults.
    pub async fn open(store: Arc<dyn KeyValueStore>) -> Result<Self, StoreError> {
        let values = PreferenceValues {
            reading_position: load_or_default(store.as_ref(), keys::PREFS_READING_POSITION)
                .await?,
            ui_language: load_or_default::<Option<UiLanguage>>(
                store.as_ref(),
                keys::PREFS_UI_LANGUAGE,
            )
            .await?
            .unwrap_or_default(),
            storage_consent: load_or_default::<Option<StorageConsent>>(
                store.as_ref(),
                keys::PREFS_STORAGE_CONSENT,
            )
            .await?
            .unwrap_or_default(),
        };
        debug!(?values, "Preferences loaded");

        let (notify, _) = watch::channel(0);
        Ok(Self {
            store,
            values: RwLock::new(values),
            notify,
        })
    }

    /// Gets a copy of all preferences.
    pub async fn get(&self) -> PreferenceValues {
        self.values.read().await.clone()
    }

    /// Last reading position, if any.
    pub async fn reading_position(&self) -> Option<ReadingPosition> {
        self.values.read().await.reading_position.clone()
    }

    /// Records the reading position.
    pub async fn set_reading_position(&self, position: ReadingPosition) -> Result<(), StoreError> {
        set_typed(self.store.as_ref(), keys::PREFS_READING_POSITION, &position).await?;
        self.values.write().await.reading_position = Some(position);
        self.notify_change();
        Ok(())
    }

    /// UI language.
    pub async fn ui_language(&self) -> UiLanguage {
        self.values.read().await.ui_language
    }

    /// Sets the UI language.
    pub async fn set_ui_language(&self, language: UiLanguage) -> Result<(), StoreError> {
        set_typed(self.store.as_ref(), keys::PREFS_UI_LANGUAGE, &language).await?;
        self.values.write().await.ui_language = language;
        info!(%language, "UI language changed");
        self.notify_change();
        Ok(())
    }

    /// Storage consent.
    pub async fn storage_consent(&self) -> StorageConsent {
        self.values.read().await.storage_consent
    }

    /// Sets storage consent. Returns true if the value changed.
    pub async fn set_storage_consent(&self, consent: StorageConsent) -> Result<bool, StoreError> {
        let mut values = self.values.write().await;
        if values.storage_consent == consent {
            return Ok(false);
        }
        set_typed(self.store.as_ref(), keys::PREFS_STORAGE_CONSENT, &consent).await?;
        values.storage_consent = consent;
        drop(values);
        info!(store_messages = consent.store_messages, "Storage consent changed");
        self.notify_change();
        Ok(true)
    }

    /// Subscribes to change notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    fn notify_change(&self) {
        self.notify.send_modify(|v| *v = v.wrapping_add(1));
    }
}

async fn load_or_default<T>(store: &dyn KeyValueStore, key: &str) -> Result<T, StoreError>
where
    T: serde::de::DeserializeOwned + Default,
{
    match get_typed::<T>(store, key).await {
        Ok(Some(v)) => Ok(v),
        Ok(None) => Ok(T::default()),
        Err(e) if e.is_corrupt() => {
            warn!(key, error = %e, "Preference unreadable, using default");
            Ok(T::default())
        }
        Err(e) => Err(e),
    }
}
