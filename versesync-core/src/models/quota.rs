//! Usage quota types.
//!
//! The server owns every counter. The client only stores the most recent
//! values it was told about and never decrements anything itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Quota Kind & Mode
// ============================================================================

/// Which limit a quota failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaKind {
    /// Rolling per-session turn cap.
    Trial,
    /// Civil-day cap, reset at the server's day boundary.
    Daily,
}

impl QuotaKind {
    /// Classifies a 429 message: anything mentioning "daily" is the daily cap.
    pub fn from_message(message: &str) -> Self {
        if message.to_lowercase().contains("daily") {
            Self::Daily
        } else {
            Self::Trial
        }
    }
}

impl fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trial => write!(f, "Trial"),
            Self::Daily => write!(f, "Daily"),
        }
    }
}

/// Whether the counters belong to an anonymous or a signed-in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaMode {
    /// Anonymous trial usage.
    #[default]
    Anonymous,
    /// Signed-in usage.
    Authenticated,
}

// ============================================================================
// Reported Fields
// ============================================================================

/// Quota fields as reported in a single server response. Absent means "not
/// reported", not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaFields {
    /// Identity mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<QuotaMode>,
    /// Trial turn cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_limit: Option<u32>,
    /// Trial turns used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_count: Option<u32>,
    /// Trial turns left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_turns: Option<i64>,
    /// Daily turn cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_turn_limit: Option<u32>,
    /// Daily turns used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_turn_count: Option<u32>,
    /// Daily turns left.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_remaining: Option<i64>,
    /// When the anonymous session expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl QuotaFields {
    /// Returns true if no field was reported.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fields for a server 429 naming `kind` as exhausted.
    pub fn exhausted(kind: QuotaKind) -> Self {
        match kind {
            QuotaKind::Trial => Self {
                remaining_turns: Some(0),
                ..Self::default()
            },
            QuotaKind::Daily => Self {
                daily_remaining: Some(0),
                ..Self::default()
            },
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// The latest server-reported quota state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Identity mode.
    pub mode: QuotaMode,
    /// Trial turn cap.
    pub turn_limit: Option<u32>,
    /// Trial turns used.
    pub turn_count: Option<u32>,
    /// Trial turns left.
    pub remaining_turns: Option<i64>,
    /// Daily turn cap.
    pub daily_turn_limit: Option<u32>,
    /// Daily turns used.
    pub daily_turn_count: Option<u32>,
    /// Daily turns left.
    pub daily_remaining: Option<i64>,
    /// When the anonymous session expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl QuotaSnapshot {
    /// Overwrites every field present in `fields`; absent fields keep their
    /// previous value.
    pub fn merge(&mut self, fields: &QuotaFields) {
        if let Some(mode) = fields.mode {
            self.mode = mode;
        }
        if fields.turn_limit.is_some() {
            self.turn_limit = fields.turn_limit;
        }
        if fields.turn_count.is_some() {
            self.turn_count = fields.turn_count;
        }
        if fields.remaining_turns.is_some() {
            self.remaining_turns = fields.remaining_turns;
        }
        if fields.daily_turn_limit.is_some() {
            self.daily_turn_limit = fields.daily_turn_limit;
        }
        if fields.daily_turn_count.is_some() {
            self.daily_turn_count = fields.daily_turn_count;
        }
        if fields.daily_remaining.is_some() {
            self.daily_remaining = fields.daily_remaining;
        }
        if fields.expires_at.is_some() {
            self.expires_at = fields.expires_at;
        }
    }

    /// Returns the first exhausted limit, trial before daily.
    pub fn exhaustion(&self) -> Option<QuotaKind> {
        if self.remaining_turns.is_some_and(|r| r <= 0) {
            Some(QuotaKind::Trial)
        } else if self.daily_remaining.is_some_and(|r| r <= 0) {
            Some(QuotaKind::Daily)
        } else {
            None
        }
    }

    /// True when either reported remainder is at or below zero.
    pub fn is_exhausted(&self) -> bool {
        self.exhaustion().is_some()
    }

    /// Returns true if any counter has been reported.
    pub fn has_data(&self) -> bool {
        self.turn_limit.is_some()
            || self.turn_count.is_some()
            || self.remaining_turns.is_some()
            || self.daily_turn_limit.is_some()
            || self.daily_turn_count.is_some()
            || self.daily_remaining.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_message() {
        assert_eq!(
            QuotaKind::from_message("Daily turn limit reached"),
            QuotaKind::Daily
        );
        assert_eq!(
            QuotaKind::from_message("trial limit reached, please sign in"),
            QuotaKind::Trial
        );
    }

    #[test]
    fn test_merge_keeps_unreported_fields() {
        let mut snap = QuotaSnapshot::default();
        snap.merge(&QuotaFields {
            turn_limit: Some(10),
            remaining_turns: Some(4),
            daily_remaining: Some(20),
            ..QuotaFields::default()
        });
        snap.merge(&QuotaFields {
            remaining_turns: Some(3),
            ..QuotaFields::default()
        });
        assert_eq!(snap.turn_limit, Some(10));
        assert_eq!(snap.remaining_turns, Some(3));
        assert_eq!(snap.daily_remaining, Some(20));
    }

    #[test]
    fn test_exhaustion_either_field() {
        let mut snap = QuotaSnapshot::default();
        assert!(!snap.is_exhausted());

        snap.merge(&QuotaFields::exhausted(QuotaKind::Daily));
        assert_eq!(snap.exhaustion(), Some(QuotaKind::Daily));

        snap.merge(&QuotaFields {
            daily_remaining: Some(5),
            remaining_turns: Some(-1),
            ..QuotaFields::default()
        });
        assert_eq!(snap.exhaustion(), Some(QuotaKind::Trial));
    }

    #[test]
    fn test_fields_ignore_unknown_keys() {
        let json = r#"{"conversation_id":"c1","remaining_turns":2,"mode":"anonymous"}"#;
        let fields: QuotaFields = serde_json::from_str(json).unwrap();
        assert_eq!(fields.remaining_turns, Some(2));
        assert_eq!(fields.mode, Some(QuotaMode::Anonymous));
        assert!(!fields.is_empty());
    }
}
