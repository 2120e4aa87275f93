//! CLI output formatting tests.
//!
//! These tests verify that CLI output is correctly formatted for both
//! text and JSON output modes.

#[cfg(test)]
fn entry() -> versesync_core::CacheEntry {
    use versesync_core::{CacheEntry, ChapterKey, ChapterPayload, Verse};

    CacheEntry::from_payload(
        &ChapterKey::new("krv", 43, 3),
        ChapterPayload {
            content_hash: "0123456789abcdef0123".to_string(),
            verses: vec![
                Verse::new(16, "하나님이 세상을 이처럼 사랑하사"),
                Verse::new(17, "하나님이 그 아들을 세상에 보내신 것은"),
            ],
        },
    )
}

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use super::entry;
    use versesync_core::{LoginThrottle, QuotaMode, QuotaSnapshot, SessionState};
    use versesync_sync::RefreshOutcome;

    #[test]
    fn test_progress_bar_boundary_values() {
        let formatter = TextFormatter::new(false);

        let test_cases = vec![
            (0.0, "░░░░░░░░░░"),
            (10.0, "█░░░░░░░░░"),
            (25.0, "███░░░░░░░"), // 2.5 rounds to 3 blocks
            (50.0, "█████░░░░░"),
            (100.0, "██████████"),
            (150.0, "██████████"),
        ];

        for (percent, expected) in test_cases {
            let bar = formatter.progress_bar(percent);
            assert_eq!(bar, expected, "Failed for {percent}%");
        }
    }

    #[test]
    fn test_progress_bar_with_colors() {
        let formatter = TextFormatter::new(true);
        assert!(formatter.progress_bar(10.0).contains("\x1b[31m"), "Should be red for <20%");
        assert!(formatter.progress_bar(30.0).contains("\x1b[33m"), "Should be yellow for <50%");
        assert!(formatter.progress_bar(80.0).contains("\x1b[32m"), "Should be green for >=50%");
    }

    #[test]
    fn test_format_chapter_lists_verses() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_chapter(&entry());

        assert!(output.starts_with("krv 43:3 (cached just now)"));
        assert!(output.contains(" 16 하나님이 세상을 이처럼 사랑하사"));
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_format_outcome() {
        let formatter = TextFormatter::new(false);

        let updated = formatter.format_outcome(&RefreshOutcome::Updated(entry()));
        assert_eq!(updated, "Updated (0123456789ab)");

        let offline = formatter.format_outcome(&RefreshOutcome::Offline {
            entry: entry(),
            reason: "timed out".to_string(),
        });
        assert!(offline.contains("timed out"));
        assert!(offline.contains("cached copy"));
    }

    #[test]
    fn test_format_quota_without_report() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_quota(&QuotaSnapshot::default());
        assert!(output.contains("no report yet"));
    }

    #[test]
    fn test_format_quota_exhausted_daily() {
        let formatter = TextFormatter::new(false);
        let quota = QuotaSnapshot {
            mode: QuotaMode::Authenticated,
            daily_turn_limit: Some(50),
            daily_turn_count: Some(50),
            daily_remaining: Some(0),
            ..QuotaSnapshot::default()
        };

        let output = formatter.format_quota(&quota);
        assert!(output.contains("signed in"));
        assert!(output.contains("░░░░░░░░░░ 0/50 left"));
        assert!(output.contains("Daily limit reached"));
    }

    #[test]
    fn test_format_session_throttled() {
        let formatter = TextFormatter::new(false);
        let throttle = LoginThrottle {
            consecutive_failures: 10,
            captcha_required: true,
            retry_after_secs: None,
        };

        let output = formatter.format_session(&SessionState::SignedOut, &throttle);
        assert!(output.contains("signed out"));
        assert!(output.contains("10 failed login attempt(s)"));
        assert!(output.contains("Captcha required"));
    }

    #[test]
    fn test_format_session_prefers_email() {
        let formatter = TextFormatter::new(false);
        let state = SessionState::SignedIn {
            user_id: "u1".to_string(),
            email: Some("reader@example.com".to_string()),
        };
        let output = formatter.format_session(&state, &LoginThrottle::default());
        assert!(output.contains("reader@example.com"));
        assert!(!output.contains("u1"));
    }

    #[test]
    fn test_no_color_has_no_escapes() {
        let formatter = TextFormatter::new(false);
        let output = formatter.format_outcome(&RefreshOutcome::Fresh(entry()));
        assert!(!output.contains('\x1b'));
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use super::entry;
    use serde_json::Value;
    use versesync_core::{ChapterKey, LoginThrottle, QuotaSnapshot, SessionState};
    use versesync_sync::RefreshOutcome;

    #[test]
    fn test_format_pretty_json() {
        let formatter = JsonFormatter::new(true);
        let json = formatter.format(&serde_json::json!({"a": 1})).unwrap();
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_format_compact_json() {
        let formatter = JsonFormatter::new(false);
        let json = formatter.format(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(json, r#"{"a":1}"#);
    }

    #[test]
    fn test_offline_chapter_output_keeps_cached_verses() {
        let formatter = JsonFormatter::new(false);
        let cached = entry();
        let outcome = RefreshOutcome::Offline {
            entry: cached.clone(),
            reason: "timed out".to_string(),
        };

        let output = formatter.chapter_output(&cached.key(), Some(&cached), &outcome);
        let value: Value = serde_json::from_str(&formatter.format(&output).unwrap()).unwrap();

        assert_eq!(value["refresh"], "offline");
        assert_eq!(value["wasCached"], true);
        assert_eq!(value["offlineReason"], "timed out");
        assert_eq!(value["verses"].as_array().unwrap().len(), 2);
        assert!(value["cachedAt"].is_string());
    }

    #[test]
    fn test_superseded_chapter_output_is_empty() {
        let formatter = JsonFormatter::new(false);
        let key = ChapterKey::new("krv", 1, 1);
        let output = formatter.chapter_output(&key, None, &RefreshOutcome::Superseded);

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["refresh"], "superseded");
        assert!(value.get("contentHash").is_none());
        assert!(value.get("offlineReason").is_none());
        assert!(value["verses"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_session_output_signed_out_omits_identity() {
        let formatter = JsonFormatter::new(false);
        let output = formatter.session_output(&SessionState::SignedOut, &LoginThrottle::default());

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["signedIn"], false);
        assert!(value.get("userId").is_none());
        assert!(value.get("retryAfterSecs").is_none());
    }

    #[test]
    fn test_quota_output_names_exhausted_limit() {
        let formatter = JsonFormatter::new(false);
        let quota = QuotaSnapshot {
            remaining_turns: Some(0),
            turn_limit: Some(5),
            ..QuotaSnapshot::default()
        };

        let value = serde_json::to_value(formatter.quota_output(&quota)).unwrap();
        assert_eq!(value["reported"], true);
        assert_eq!(value["exhausted"], true);
        assert_eq!(value["exhaustedBy"], "trial");
        assert_eq!(value["remaining_turns"], 0);
    }
}
