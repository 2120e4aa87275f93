//! Local device preferences.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::content::ChapterKey;

/// Last chapter the reader had open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPosition {
    /// Translation identifier.
    pub version_id: String,
    /// Book identifier.
    pub book_id: u32,
    /// Chapter number.
    pub chapter: u32,
}

impl From<&ChapterKey> for ReadingPosition {
    fn from(key: &ChapterKey) -> Self {
        Self {
            version_id: key.version_id.clone(),
            book_id: key.book_id,
            chapter: key.chapter,
        }
    }
}

impl ReadingPosition {
    /// Returns the chapter key of this position.
    pub fn key(&self) -> ChapterKey {
        ChapterKey::new(self.version_id.clone(), self.book_id, self.chapter)
    }
}

/// UI language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiLanguage {
    /// Korean.
    #[default]
    Ko,
    /// English.
    En,
}

impl UiLanguage {
    /// Locale tag sent to the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
        }
    }

    /// Default translation for this language.
    pub fn default_version(&self) -> &'static str {
        match self {
            Self::Ko => "krv",
            Self::En => "eng-web",
        }
    }
}

impl fmt::Display for UiLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UiLanguage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower.starts_with("ko") {
            Ok(Self::Ko)
        } else if lower.starts_with("en") {
            Ok(Self::En)
        } else {
            Err(format!("unsupported language: {s}"))
        }
    }
}

/// Whether the user consented to chat transcripts being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageConsent {
    /// Consent flag.
    pub store_messages: bool,
}
