//! Library and chat payloads.
//!
//! Bookmarks, memos, user settings, and the chat conversation wire types.

use serde::{Deserialize, Serialize};

use super::quota::QuotaFields;

// ============================================================================
// Bookmarks & Memos
// ============================================================================

/// A verse location used to create or delete a bookmark or memo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseRef {
    /// Translation identifier.
    pub version_id: String,
    /// Book identifier.
    pub book_id: u32,
    /// Chapter number.
    pub chapter: u32,
    /// Verse number.
    pub verse: u32,
}

impl VerseRef {
    /// Creates a verse reference.
    pub fn new(version_id: impl Into<String>, book_id: u32, chapter: u32, verse: u32) -> Self {
        Self {
            version_id: version_id.into(),
            book_id,
            chapter,
            verse,
        }
    }

    /// Query parameters identifying this verse.
    pub fn query(&self) -> Vec<(String, String)> {
        vec![
            ("version_id".to_string(), self.version_id.clone()),
            ("book_id".to_string(), self.book_id.to_string()),
            ("chapter".to_string(), self.chapter.to_string()),
            ("verse".to_string(), self.verse.to_string()),
        ]
    }
}

/// A saved bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Translation identifier.
    pub version_id: String,
    /// Book identifier.
    pub book_id: u32,
    /// Book name.
    pub book_name: String,
    /// Chapter number.
    pub chapter: u32,
    /// Verse number.
    pub verse: u32,
    /// Server timestamp, passed through as text.
    pub created_at: String,
}

/// A saved memo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    /// Translation identifier.
    pub version_id: String,
    /// Book identifier.
    pub book_id: u32,
    /// Book name.
    pub book_name: String,
    /// Chapter number.
    pub chapter: u32,
    /// Verse number.
    pub verse: u32,
    /// Memo body.
    pub memo_text: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Request body of `POST /bible/memos`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoRequest {
    /// Target verse.
    #[serde(flatten)]
    pub target: VerseRef,
    /// Memo body.
    pub memo_text: String,
}

/// `{"items": [...]}` list wrapper used by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemList<T> {
    /// Items.
    pub items: Vec<T>,
}

// ============================================================================
// Settings
// ============================================================================

/// Server-side user settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    /// Whether chat transcripts may be stored.
    pub store_messages: bool,
}

// ============================================================================
// Chat
// ============================================================================

/// Request body of `POST /chat/conversations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    /// Stable device identifier, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// UI locale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Translation to cite from.
    pub version_id: String,
    /// Storage consent.
    pub store_messages: bool,
}

/// Response of `POST /chat/conversations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationCreated {
    /// Conversation handle.
    pub conversation_id: String,
    /// Creation timestamp.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Storage consent the server recorded.
    #[serde(default)]
    pub store_messages: bool,
    /// Quota fields, if reported.
    #[serde(flatten)]
    pub quota: QuotaFields,
}

/// Request body of `POST /chat/conversations/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    /// The user's message.
    pub user_message: String,
}

/// A verse range cited by an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Translation identifier.
    pub version_id: String,
    /// Book identifier.
    pub book_id: u32,
    /// Book name.
    pub book_name: String,
    /// Chapter number.
    pub chapter: u32,
    /// First verse.
    pub verse_start: u32,
    /// Last verse.
    pub verse_end: u32,
    /// Quoted text.
    pub text: String,
}

/// Response of `POST /chat/conversations/{id}/messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    /// Assistant text.
    pub assistant_message: String,
    /// Cited verses.
    #[serde(default)]
    pub citations: Vec<Citation>,
    /// Quota fields, if reported.
    #[serde(flatten)]
    pub quota: QuotaFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_request_flattens_target() {
        let req = MemoRequest {
            target: VerseRef::new("krv", 1, 1, 1),
            memo_text: "note".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["version_id"], "krv");
        assert_eq!(json["verse"], 1);
        assert_eq!(json["memo_text"], "note");
    }

    #[test]
    fn test_chat_reply_collects_quota() {
        let json = r#"{
            "assistant_message": "Peace be with you.",
            "citations": [{"version_id":"krv","book_id":43,"book_name":"John","chapter":14,"verse_start":27,"verse_end":27,"text":"..."}],
            "memory": {"mode": "summary", "recent_turns": 3},
            "remaining_turns": 2,
            "daily_remaining": 40
        }"#;
        let reply: ChatReply = serde_json::from_str(json).unwrap();
        assert_eq!(reply.citations.len(), 1);
        assert_eq!(reply.quota.remaining_turns, Some(2));
        assert_eq!(reply.quota.daily_remaining, Some(40));
    }

    #[test]
    fn test_conversation_created_without_quota() {
        let json = r#"{"conversation_id":"c-1","created_at":"2026-01-01T00:00:00Z","store_messages":false}"#;
        let created: ConversationCreated = serde_json::from_str(json).unwrap();
        assert_eq!(created.conversation_id, "c-1");
        assert!(created.quota.is_empty());
    }

    #[test]
    fn test_verse_ref_query() {
        let q = VerseRef::new("eng-web", 19, 23, 1).query();
        assert_eq!(q.len(), 4);
        assert_eq!(q[1], ("book_id".to_string(), "19".to_string()));
    }
}
