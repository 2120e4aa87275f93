//! Domain models for VerseSync.
//!
//! ## Submodules
//!
//! - [`content`] - Chapters, verses, cache entries, notices
//! - [`session`] - Credentials, PKCE handshake, session state
//! - [`quota`] - Quota snapshot and reported fields
//! - [`library`] - Bookmarks, memos, settings, chat payloads
//! - [`preferences`] - Reading position, language, storage consent

mod content;
mod library;
mod preferences;
mod quota;
mod session;

// Re-export everything at the models level
pub use content::{
    Book, BookList, CacheEntry, ChapterKey, ChapterPayload, ContentNotice, SearchHit,
    SearchResults, Verse,
};
pub use library::{
    Bookmark, ChatReply, Citation, ConversationCreated, CreateConversationRequest, ItemList,
    Memo, MemoRequest, MessageRequest, UserSettings, VerseRef,
};
pub use preferences::{ReadingPosition, StorageConsent, UiLanguage};
pub use quota::{QuotaFields, QuotaKind, QuotaMode, QuotaSnapshot};
pub use session::{
    CredentialPair, LoginThrottle, OAUTH_STATE_TTL_SECS, PkceHandshakeState, SessionState,
};
