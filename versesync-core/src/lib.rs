// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `VerseSync` Core
//!
//! Core types, models, and the error taxonomy shared by every `VerseSync`
//! crate:
//!
//! - Domain models (chapters, credentials, quotas, library items)
//! - The uniform [`SyncError`] type
//!
//! ## Key Types
//!
//! ### Content
//! - [`ChapterKey`] - `(version, book, chapter)` composite key
//! - [`CacheEntry`] - Locally cached chapter
//! - [`ChapterPayload`] - Chapter as served, with its server hash
//! - [`ContentNotice`] - Background refresh notice
//!
//! ### Session
//! - [`CredentialPair`] - Access/refresh token pair
//! - [`PkceHandshakeState`] - Pending OAuth handshake
//! - [`SessionState`] - Signed-in or signed-out
//!
//! ### Quota
//! - [`QuotaSnapshot`] - Latest server-reported counters
//! - [`QuotaFields`] - Fields reported by a single response
//! - [`QuotaKind`] - Trial or daily

pub mod error;
pub mod models;

// Re-export error types
pub use error::{AuthError, ErrorBody, ErrorEnvelope, SyncError};

// Re-export all model types
pub use models::{
    // Content
    Book,
    BookList,
    CacheEntry,
    ChapterKey,
    ChapterPayload,
    ContentNotice,
    SearchHit,
    SearchResults,
    Verse,
    // Session
    CredentialPair,
    LoginThrottle,
    OAUTH_STATE_TTL_SECS,
    PkceHandshakeState,
    SessionState,
    // Quota
    QuotaFields,
    QuotaKind,
    QuotaMode,
    QuotaSnapshot,
    // Library & chat
    Bookmark,
    ChatReply,
    Citation,
    ConversationCreated,
    CreateConversationRequest,
    ItemList,
    Memo,
    MemoRequest,
    MessageRequest,
    UserSettings,
    VerseRef,
    // Preferences
    ReadingPosition,
    StorageConsent,
    UiLanguage,
};
