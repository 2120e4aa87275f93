//! Read-through chapter sync.
//!
//! A load hands back whatever the cache holds right away and a refresh
//! future for the network half. The refresh writes only the key it was
//! started for, so a stale response can never land on a newer selection.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, instrument, warn};
use versesync_core::{CacheEntry, ChapterKey, ChapterPayload, ContentNotice, SyncError};
use versesync_fetch::{ApiRequest, endpoints};
use versesync_store::ContentCache;

use crate::gateway::{CallKind, RequestGateway};

/// Buffered notices per subscriber before the oldest are dropped.
const NOTICE_CAPACITY: usize = 32;

/// How a background refresh ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Nothing was cached; the fetched chapter is now.
    Fresh(CacheEntry),
    /// The server hash matched the cached one.
    Unchanged(CacheEntry),
    /// The cached chapter was replaced and an `Updated` notice sent.
    Updated(CacheEntry),
    /// The fetch failed; the cached copy stands and an `Offline` notice
    /// was sent.
    Offline {
        /// The cached copy still on display.
        entry: CacheEntry,
        /// Transport failure description.
        reason: String,
    },
    /// Another chapter was selected while this one was in flight.
    Superseded,
}

impl RefreshOutcome {
    /// The entry to display, if the outcome carries one.
    pub fn entry(&self) -> Option<&CacheEntry> {
        match self {
            Self::Fresh(entry)
            | Self::Unchanged(entry)
            | Self::Updated(entry)
            | Self::Offline { entry, .. } => Some(entry),
            Self::Superseded => None,
        }
    }
}

/// Cache-first chapter loading with change notices.
pub struct ContentSync {
    gateway: Arc<RequestGateway>,
    cache: Arc<ContentCache>,
    selected: RwLock<Option<ChapterKey>>,
    notices: broadcast::Sender<ContentNotice>,
}

impl ContentSync {
    /// Creates a content sync over `cache`, fetching through `gateway`.
    pub fn new(gateway: Arc<RequestGateway>, cache: Arc<ContentCache>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            gateway,
            cache,
            selected: RwLock::new(None),
            notices,
        }
    }

    /// Subscribes to content notices.
    pub fn subscribe(&self) -> broadcast::Receiver<ContentNotice> {
        self.notices.subscribe()
    }

    /// Records the chapter the user is looking at.
    pub async fn select(&self, key: ChapterKey) {
        debug!(key = %key, "Chapter selected");
        *self.selected.write().await = Some(key);
    }

    /// The chapter the user is looking at.
    pub async fn selected(&self) -> Option<ChapterKey> {
        self.selected.read().await.clone()
    }

    /// The cache this sync writes to.
    pub fn cache(&self) -> &Arc<ContentCache> {
        &self.cache
    }

    /// Returns the cached entry for `key` and marks it recently used.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the cache cannot be read.
    pub async fn cached(&self, key: &ChapterKey) -> Result<Option<CacheEntry>, SyncError> {
        Ok(self.cache.get(key).await?)
    }

    /// Selects `key` and returns its cached entry together with the
    /// refresh that brings it up to date.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Storage` if the cache cannot be read.
    pub async fn load(
        &self,
        key: ChapterKey,
    ) -> Result<
        (
            Option<CacheEntry>,
            BoxFuture<'_, Result<RefreshOutcome, SyncError>>,
        ),
        SyncError,
    > {
        self.select(key.clone()).await;
        let cached = self.cached(&key).await?;
        let refresh = async move { self.refresh(&key).await }.boxed();
        Ok((cached, refresh))
    }

    /// Fetches `key` and reconciles it with the cache.
    ///
    /// # Errors
    ///
    /// - `SyncError::Network` when the fetch fails and nothing is cached
    /// - any other mapped server error (e.g. `404` for a missing chapter)
    #[instrument(skip(self), fields(key = %key))]
    pub async fn refresh(&self, key: &ChapterKey) -> Result<RefreshOutcome, SyncError> {
        let prior = self.cache.peek(key).await?;
        let request = ApiRequest::get(endpoints::chapter(&key.version_id, key.book_id, key.chapter));
        let fetched = self
            .gateway
            .call::<ChapterPayload>(CallKind::Read, request)
            .await;
        let current = self.is_current(key).await;

        match fetched {
            Ok(payload) => {
                let entry = self.cache.put(key, payload).await?;
                if !current {
                    debug!("Refresh superseded by a newer selection");
                    return Ok(RefreshOutcome::Superseded);
                }
                Ok(match prior {
                    None => RefreshOutcome::Fresh(entry),
                    Some(prior) if prior.content_hash == entry.content_hash => {
                        RefreshOutcome::Unchanged(entry)
                    }
                    Some(prior) => {
                        info!(old = %prior.content_hash, new = %entry.content_hash, "Chapter updated");
                        self.notify(ContentNotice::Updated {
                            key: key.clone(),
                            content_hash: entry.content_hash.clone(),
                        });
                        RefreshOutcome::Updated(entry)
                    }
                })
            }
            Err(e) if e.is_network() => match prior {
                Some(_) if !current => Ok(RefreshOutcome::Superseded),
                Some(entry) => {
                    let reason = e.to_string();
                    warn!(%reason, "Refresh failed, showing cached chapter");
                    self.notify(ContentNotice::Offline {
                        key: key.clone(),
                        reason: reason.clone(),
                    });
                    Ok(RefreshOutcome::Offline { entry, reason })
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    async fn is_current(&self, key: &ChapterKey) -> bool {
        self.selected
            .read()
            .await
            .as_ref()
            .is_none_or(|selected| selected == key)
    }

    fn notify(&self, notice: ContentNotice) {
        if self.notices.send(notice).is_err() {
            debug!("No content notice subscribers");
        }
    }
}
