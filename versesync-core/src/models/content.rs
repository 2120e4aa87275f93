//! Chapter content types.
//!
//! - [`ChapterKey`] - Composite identifier of a chapter
//! - [`Verse`] - Single verse
//! - [`ChapterPayload`] - Chapter as returned by the server
//! - [`CacheEntry`] - Chapter as held in the local cache
//! - [`Book`], [`SearchHit`], [`SearchResults`] - Catalogue and search payloads
//! - [`ContentNotice`] - Background refresh notices

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Chapter Key
// ============================================================================

/// Composite identifier `(version, book, chapter)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterKey {
    /// Translation identifier (e.g. `krv`, `eng-web`).
    pub version_id: String,
    /// Numeric book identifier.
    pub book_id: u32,
    /// Chapter number within the book.
    pub chapter: u32,
}

impl ChapterKey {
    /// Creates a new chapter key.
    pub fn new(version_id: impl Into<String>, book_id: u32, chapter: u32) -> Self {
        Self {
            version_id: version_id.into(),
            book_id,
            chapter,
        }
    }

    /// Key suffix used in persisted storage: `{version}:{book}:{chapter}`.
    pub fn storage_suffix(&self) -> String {
        format!("{}:{}:{}", self.version_id, self.book_id, self.chapter)
    }

    /// Parses a storage suffix back into a key.
    pub fn from_storage_suffix(s: &str) -> Option<Self> {
        let mut parts = s.rsplitn(3, ':');
        let chapter = parts.next()?.parse().ok()?;
        let book_id = parts.next()?.parse().ok()?;
        let version_id = parts.next()?;
        if version_id.is_empty() {
            return None;
        }
        Some(Self::new(version_id, book_id, chapter))
    }
}

impl fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.version_id, self.book_id, self.chapter)
    }
}

// ============================================================================
// Verses & Payloads
// ============================================================================

/// A single verse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    /// Verse number.
    pub verse: u32,
    /// Verse text.
    pub text: String,
}

impl Verse {
    /// Creates a verse.
    pub fn new(verse: u32, text: impl Into<String>) -> Self {
        Self {
            verse,
            text: text.into(),
        }
    }
}

/// Chapter body as served by `GET /bible/{version}/books/{book}/chapters/{chapter}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterPayload {
    /// Opaque server-computed hash of the verse list. Only compared for
    /// equality with the cached copy.
    pub content_hash: String,
    /// Verses in order.
    pub verses: Vec<Verse>,
}

// ============================================================================
// Cache Entry
// ============================================================================

/// A cached chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Translation identifier.
    pub version_id: String,
    /// Book identifier.
    pub book_id: u32,
    /// Chapter number.
    pub chapter: u32,
    /// Verses in order.
    pub verses: Vec<Verse>,
    /// Hash of the verse list as reported by the server.
    pub content_hash: String,
    /// When this entry was written.
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Builds an entry for `key` from a server payload, stamped now.
    pub fn from_payload(key: &ChapterKey, payload: ChapterPayload) -> Self {
        Self {
            version_id: key.version_id.clone(),
            book_id: key.book_id,
            chapter: key.chapter,
            verses: payload.verses,
            content_hash: payload.content_hash,
            cached_at: Utc::now(),
        }
    }

    /// Returns the key of this entry.
    pub fn key(&self) -> ChapterKey {
        ChapterKey::new(self.version_id.clone(), self.book_id, self.chapter)
    }
}

// ============================================================================
// Catalogue & Search
// ============================================================================

/// A book of a translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Book identifier.
    pub book_id: u32,
    /// OSIS code (e.g. `Gen`).
    pub osis_code: String,
    /// Localized book name.
    #[serde(alias = "ko_name")]
    pub name: String,
    /// Abbreviation.
    pub abbr: String,
    /// Number of chapters.
    pub chapter_count: u32,
    /// `OT` or `NT`.
    pub testament: String,
}

/// Response of `GET /bible/{version}/books`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookList {
    /// Books in canonical order.
    pub items: Vec<Book>,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Book identifier.
    pub book_id: u32,
    /// Book name.
    pub book_name: String,
    /// Chapter number.
    pub chapter: u32,
    /// Verse number.
    pub verse: u32,
    /// Highlighted snippet.
    pub snippet: String,
    /// Full verse text.
    pub text: String,
}

/// Response of `GET /bible/{version}/search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// Total hits available.
    pub total: u64,
    /// Hits in this page.
    pub items: Vec<SearchHit>,
}

// ============================================================================
// Notices
// ============================================================================

/// Content notice published after a background refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentNotice {
    /// The cached chapter was replaced with newer content.
    Updated {
        /// Chapter that changed.
        key: ChapterKey,
        /// Hash of the new content.
        content_hash: String,
    },
    /// The refresh failed; the cached copy remains on display.
    Offline {
        /// Chapter whose refresh failed.
        key: ChapterKey,
        /// Transport failure description.
        reason: String,
    },
}

impl ContentNotice {
    /// Returns the chapter the notice refers to.
    pub fn key(&self) -> &ChapterKey {
        match self {
            Self::Updated { key, .. } | Self::Offline { key, .. } => key,
        }
    }
}
