//! Catalogue, search, bookmarks, memos, and account settings.

use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};
use versesync_core::{
    Book, BookList, Bookmark, ItemList, Memo, MemoRequest, SearchResults, SyncError,
    UserSettings, VerseRef,
};
use versesync_fetch::{ApiRequest, endpoints};

use crate::gateway::{CallKind, RequestGateway};

/// Default page size for search.
pub const DEFAULT_SEARCH_LIMIT: u32 = 50;
/// Largest page size the server accepts for search.
pub const MAX_SEARCH_LIMIT: u32 = 100;

#[derive(Deserialize)]
struct Created {
    created: bool,
}

#[derive(Deserialize)]
struct Deleted {
    deleted: bool,
}

#[derive(Deserialize)]
struct Saved {
    saved: bool,
}

/// Server-side reading library.
pub struct Library {
    gateway: Arc<RequestGateway>,
}

impl Library {
    /// Creates a library client.
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    /// Books of `version_id` in canonical order.
    ///
    /// # Errors
    ///
    /// Returns the mapped error on failure (`404` for an unknown version).
    pub async fn books(&self, version_id: &str) -> Result<Vec<Book>, SyncError> {
        let list: BookList = self
            .gateway
            .call(CallKind::Read, ApiRequest::get(endpoints::books(version_id)))
            .await?;
        Ok(list.items)
    }

    /// Full-text search. `limit` is clamped to `1..=100`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Validation` for a blank query without a request.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        version_id: &str,
        query: &str,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<SearchResults, SyncError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SyncError::Validation {
                message: "search query required".to_string(),
                details: Vec::new(),
            });
        }
        let limit = limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);

        let request = ApiRequest::get(endpoints::search(version_id))
            .with_query("q", query)
            .with_query("limit", limit)
            .with_query("offset", offset);
        self.gateway.call(CallKind::Read, request).await
    }

    // ------------------------------------------------------------------------
    // Bookmarks
    // ------------------------------------------------------------------------

    /// Bookmarks in `version_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when not signed in.
    pub async fn bookmarks(&self, version_id: &str) -> Result<Vec<Bookmark>, SyncError> {
        let request = ApiRequest::get(endpoints::BOOKMARKS).with_query("version_id", version_id);
        let list: ItemList<Bookmark> = self.gateway.call(CallKind::Read, request).await?;
        Ok(list.items)
    }

    /// Bookmarks a verse. Returns false if it was already bookmarked.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when not signed in.
    #[instrument(skip(self), fields(target = ?target))]
    pub async fn add_bookmark(&self, target: &VerseRef) -> Result<bool, SyncError> {
        let request = ApiRequest::post(endpoints::BOOKMARKS).with_json(target)?;
        let reply: Created = self.gateway.call(CallKind::Mutation, request).await?;
        debug!(created = reply.created, "Bookmark added");
        Ok(reply.created)
    }

    /// Removes a bookmark. Returns false if none existed.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when not signed in.
    #[instrument(skip(self), fields(target = ?target))]
    pub async fn remove_bookmark(&self, target: &VerseRef) -> Result<bool, SyncError> {
        let request = ApiRequest::delete(endpoints::BOOKMARKS).with_query_pairs(target.query());
        let reply: Deleted = self.gateway.call(CallKind::Mutation, request).await?;
        Ok(reply.deleted)
    }

    // ------------------------------------------------------------------------
    // Memos
    // ------------------------------------------------------------------------

    /// Memos in `version_id`, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when not signed in.
    pub async fn memos(&self, version_id: &str) -> Result<Vec<Memo>, SyncError> {
        let request = ApiRequest::get(endpoints::MEMOS).with_query("version_id", version_id);
        let list: ItemList<Memo> = self.gateway.call(CallKind::Read, request).await?;
        Ok(list.items)
    }

    /// Creates or replaces the memo on a verse.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Validation` for blank text without a request.
    #[instrument(skip(self, memo_text), fields(target = ?target))]
    pub async fn save_memo(&self, target: &VerseRef, memo_text: &str) -> Result<bool, SyncError> {
        let memo_text = memo_text.trim();
        if memo_text.is_empty() {
            return Err(SyncError::Validation {
                message: "memo_text required".to_string(),
                details: Vec::new(),
            });
        }
        let request = ApiRequest::post(endpoints::MEMOS).with_json(&MemoRequest {
            target: target.clone(),
            memo_text: memo_text.to_string(),
        })?;
        let reply: Saved = self.gateway.call(CallKind::Mutation, request).await?;
        Ok(reply.saved)
    }

    /// Deletes the memo on a verse. Returns false if none existed.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when not signed in.
    #[instrument(skip(self), fields(target = ?target))]
    pub async fn delete_memo(&self, target: &VerseRef) -> Result<bool, SyncError> {
        let request = ApiRequest::delete(endpoints::MEMOS).with_query_pairs(target.query());
        let reply: Deleted = self.gateway.call(CallKind::Mutation, request).await?;
        Ok(reply.deleted)
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Account settings.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when not signed in.
    pub async fn settings(&self) -> Result<UserSettings, SyncError> {
        self.gateway
            .call(CallKind::Read, ApiRequest::get(endpoints::USER_SETTINGS))
            .await
    }

    /// Updates whether the server keeps chat transcripts.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Unauthorized` when not signed in.
    pub async fn update_settings(&self, store_messages: bool) -> Result<UserSettings, SyncError> {
        let request = ApiRequest::patch(endpoints::USER_SETTINGS)
            .with_body(json!({"store_messages": store_messages}));
        self.gateway.call(CallKind::Mutation, request).await
    }
}
