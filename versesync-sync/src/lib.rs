// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `VerseSync` Sync
//!
//! The client state machines of `VerseSync`.
//!
//! This crate contains:
//!
//! - **SessionManager**: Login, registration, PKCE OAuth, refresh, logout
//! - **RequestGateway**: Bearer attachment and the single refresh-and-retry
//! - **ContentSync**: Cache-first chapter loading with change notices
//! - **QuotaReconciler**: Server-authoritative chat quota
//! - **ChatSession**: Lazily created conversations
//! - **Library**: Books, search, bookmarks, memos, settings
//! - **SyncClient**: Owns all of the above over one persisted store
//!
//! ## Usage
//!
//! ```ignore
//! use versesync_sync::SyncClient;
//! use versesync_store::ClientConfig;
//! use versesync_core::ChapterKey;
//!
//! let client = SyncClient::open(ClientConfig::load()?).await?;
//! let (cached, refresh) = client.content().load(ChapterKey::new("krv", 1, 1)).await?;
//! if let Some(entry) = cached {
//!     render(&entry);
//! }
//! let outcome = refresh.await?;
//! ```

pub mod chat;
pub mod client;
pub mod content;
pub mod gateway;
pub mod library;
pub mod pkce;
pub mod quota;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chat::ChatSession;
pub use client::SyncClient;
pub use content::{ContentSync, RefreshOutcome};
pub use gateway::{CallKind, RequestGateway};
pub use library::{DEFAULT_SEARCH_LIMIT, Library, MAX_SEARCH_LIMIT};
pub use pkce::{CHALLENGE_METHOD, PkcePair};
pub use quota::QuotaReconciler;
pub use session::{OAuthStart, SessionManager, check_password, normalize_email};
