//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use versesync_core::{
    CacheEntry, ChapterKey, LoginThrottle, QuotaSnapshot, SessionState, Verse,
};
use versesync_store::PreferenceValues;
use versesync_sync::RefreshOutcome;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for an opened chapter.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterOutput {
    pub version_id: String,
    pub book_id: u32,
    pub chapter: u32,
    /// How the refresh ended: fresh, unchanged, updated, offline, superseded.
    pub refresh: &'static str,
    /// Whether a cached copy was available before the refresh.
    pub was_cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_datetime_opt"
    )]
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_reason: Option<String>,
    pub verses: Vec<Verse>,
}

/// Session status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutput {
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub consecutive_failures: u32,
    pub captcha_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Quota status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaOutput {
    pub reported: bool,
    pub exhausted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhausted_by: Option<String>,
    #[serde(flatten)]
    pub snapshot: QuotaSnapshot,
}

/// Combined client status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub api_base_url: String,
    pub session: SessionOutput,
    pub quota: QuotaOutput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_position: Option<String>,
    pub ui_language: String,
    pub store_messages: bool,
    pub cached_chapters: usize,
    pub cache_capacity: usize,
}

// ============================================================================
// Serialization helpers
// ============================================================================

#[allow(clippy::ref_option)]
fn serialize_datetime_opt<S>(dt: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match dt {
        Some(dt) => s.serialize_str(&dt.to_rfc3339()),
        None => s.serialize_none(),
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Converts an opened chapter to output.
    pub fn chapter_output(
        &self,
        key: &ChapterKey,
        cached: Option<&CacheEntry>,
        outcome: &RefreshOutcome,
    ) -> ChapterOutput {
        let refresh = match outcome {
            RefreshOutcome::Fresh(_) => "fresh",
            RefreshOutcome::Unchanged(_) => "unchanged",
            RefreshOutcome::Updated(_) => "updated",
            RefreshOutcome::Offline { .. } => "offline",
            RefreshOutcome::Superseded => "superseded",
        };
        let offline_reason = match outcome {
            RefreshOutcome::Offline { reason, .. } => Some(reason.clone()),
            _ => None,
        };
        let shown = outcome.entry().or(cached);

        ChapterOutput {
            version_id: key.version_id.clone(),
            book_id: key.book_id,
            chapter: key.chapter,
            refresh,
            was_cached: cached.is_some(),
            content_hash: shown.map(|e| e.content_hash.clone()),
            cached_at: shown.map(|e| e.cached_at),
            offline_reason,
            verses: shown.map(|e| e.verses.clone()).unwrap_or_default(),
        }
    }

    /// Converts session state to output.
    pub fn session_output(&self, state: &SessionState, throttle: &LoginThrottle) -> SessionOutput {
        let (user_id, email) = match state {
            SessionState::SignedIn { user_id, email } => (Some(user_id.clone()), email.clone()),
            SessionState::SignedOut => (None, None),
        };
        SessionOutput {
            signed_in: state.is_signed_in(),
            user_id,
            email,
            consecutive_failures: throttle.consecutive_failures,
            captcha_required: throttle.captcha_required,
            retry_after_secs: throttle.retry_after_secs,
        }
    }

    /// Converts a quota snapshot to output.
    pub fn quota_output(&self, quota: &QuotaSnapshot) -> QuotaOutput {
        QuotaOutput {
            reported: quota.has_data(),
            exhausted: quota.is_exhausted(),
            exhausted_by: quota.exhaustion().map(|k| k.to_string().to_lowercase()),
            snapshot: quota.clone(),
        }
    }

    /// Assembles the combined status.
    pub fn status_output(
        &self,
        api_base_url: &str,
        session: SessionOutput,
        quota: QuotaOutput,
        prefs: &PreferenceValues,
        cached_chapters: usize,
        cache_capacity: usize,
    ) -> StatusOutput {
        StatusOutput {
            api_base_url: api_base_url.to_string(),
            session,
            quota,
            reading_position: prefs.reading_position.as_ref().map(|p| p.key().to_string()),
            ui_language: prefs.ui_language.to_string(),
            store_messages: prefs.storage_consent.store_messages,
            cached_chapters,
            cache_capacity,
        }
    }
}
