//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Duration, Local, Utc};
use versesync_core::{
    Book, Bookmark, CacheEntry, ChatReply, LoginThrottle, Memo, QuotaMode, QuotaSnapshot,
    SearchResults, SessionState,
};
use versesync_sync::RefreshOutcome;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Formats a chapter with its verses.
    pub fn format_chapter(&self, entry: &CacheEntry) -> String {
        let mut lines = Vec::with_capacity(entry.verses.len() + 1);
        lines.push(format!(
            "{} {}",
            self.bold(&entry.key().to_string()),
            self.dim(&format!("(cached {})", self.format_age(entry.cached_at)))
        ));
        for verse in &entry.verses {
            lines.push(format!("{:>3} {}", self.dim(&verse.verse.to_string()), verse.text));
        }
        lines.join("\n")
    }

    /// Formats how a background refresh ended.
    pub fn format_outcome(&self, outcome: &RefreshOutcome) -> String {
        match outcome {
            RefreshOutcome::Fresh(_) => self.green("Fetched from server"),
            RefreshOutcome::Unchanged(_) => self.dim("Up to date"),
            RefreshOutcome::Updated(entry) => {
                format!("{} ({})", self.yellow("Updated"), short_hash(&entry.content_hash))
            }
            RefreshOutcome::Offline { reason, .. } => format!(
                "{}: {} - showing cached copy",
                self.red("Offline"),
                reason
            ),
            RefreshOutcome::Superseded => self.dim("Superseded by another chapter"),
        }
    }

    /// Formats the book list of a version.
    pub fn format_books(&self, books: &[Book]) -> String {
        let mut lines = vec![format!(
            "{:<4} {:<8} {:<24} {}",
            self.bold("ID"),
            self.bold("Code"),
            self.bold("Name"),
            self.bold("Chapters")
        )];
        for book in books {
            lines.push(format!(
                "{:<4} {:<8} {:<24} {}",
                book.book_id, book.osis_code, book.name, book.chapter_count
            ));
        }
        lines.join("\n")
    }

    /// Formats one page of search results.
    pub fn format_search(&self, results: &SearchResults, offset: u32) -> String {
        if results.items.is_empty() {
            return self.dim("No matches");
        }
        let shown = offset as usize + results.items.len();
        let mut lines = vec![self.dim(&format!(
            "{}-{} of {} matches",
            offset + 1,
            shown,
            results.total
        ))];
        for hit in &results.items {
            lines.push(format!(
                "{} {}",
                self.cyan(&format!("{} {}:{}", hit.book_name, hit.chapter, hit.verse)),
                hit.snippet
            ));
        }
        lines.join("\n")
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Formats a bookmark list.
    pub fn format_bookmarks(&self, bookmarks: &[Bookmark]) -> String {
        if bookmarks.is_empty() {
            return self.dim("No bookmarks");
        }
        bookmarks
            .iter()
            .map(|b| {
                format!(
                    "{} {}",
                    self.cyan(&format!("{} {}:{}", b.book_name, b.chapter, b.verse)),
                    self.dim(&b.created_at)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Formats a memo list.
    pub fn format_memos(&self, memos: &[Memo]) -> String {
        if memos.is_empty() {
            return self.dim("No memos");
        }
        memos
            .iter()
            .map(|m| {
                format!(
                    "{} {}\n    {}",
                    self.cyan(&format!("{} {}:{}", m.book_name, m.chapter, m.verse)),
                    self.dim(&m.updated_at),
                    m.memo_text
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ========================================================================
    // Chat
    // ========================================================================

    /// Formats an assistant reply with its citations.
    pub fn format_reply(&self, reply: &ChatReply) -> String {
        let mut lines = vec![reply.assistant_message.clone()];
        if !reply.citations.is_empty() {
            lines.push(String::new());
            for c in &reply.citations {
                let range = if c.verse_end > c.verse_start {
                    format!("{}-{}", c.verse_start, c.verse_end)
                } else {
                    c.verse_start.to_string()
                };
                lines.push(format!(
                    "  {} {}",
                    self.cyan(&format!("{} {}:{}", c.book_name, c.chapter, range)),
                    self.dim(&c.text)
                ));
            }
        }
        lines.join("\n")
    }

    /// Formats the latest quota report.
    pub fn format_quota(&self, quota: &QuotaSnapshot) -> String {
        if !quota.has_data() {
            return format!("{:<8} {}", "Quota:", self.dim("no report yet"));
        }

        let mode = match quota.mode {
            QuotaMode::Anonymous => "trial",
            QuotaMode::Authenticated => "signed in",
        };
        let mut lines = vec![format!("{:<8} {}", "Quota:", mode)];

        if let Some(remaining) = quota.remaining_turns {
            lines.push(self.format_counter("Turns:", remaining, quota.turn_limit));
        }
        if let Some(remaining) = quota.daily_remaining {
            lines.push(self.format_counter("Today:", remaining, quota.daily_turn_limit));
        }
        if let Some(expires_at) = quota.expires_at {
            lines.push(format!(
                "         Resets {}",
                self.dim(&self.format_until(expires_at))
            ));
        }
        if let Some(kind) = quota.exhaustion() {
            lines.push(self.red(&format!("{kind} limit reached")));
        }
        lines.join("\n")
    }

    fn format_counter(&self, label: &str, remaining: i64, limit: Option<u32>) -> String {
        let remaining = remaining.max(0);
        match limit.filter(|l| *l > 0) {
            Some(limit) => {
                #[allow(clippy::cast_precision_loss)]
                let percent = remaining as f64 / f64::from(limit) * 100.0;
                let bar = self.progress_bar(percent);
                let text = self.color_for_percent(percent, &format!("{remaining}/{limit} left"));
                format!("{label:<8} {bar} {text}")
            }
            None => format!("{label:<8} {remaining} left"),
        }
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Formats sign-in state and login throttling.
    pub fn format_session(&self, state: &SessionState, throttle: &LoginThrottle) -> String {
        let mut lines = Vec::new();
        match state {
            SessionState::SignedIn { user_id, email } => {
                let who = email.as_deref().unwrap_or(user_id);
                lines.push(format!("{:<8} {}", "Session:", self.green(who)));
            }
            SessionState::SignedOut => {
                lines.push(format!("{:<8} {}", "Session:", self.dim("signed out")));
            }
        }
        if throttle.consecutive_failures > 0 {
            lines.push(format!(
                "         {} failed login attempt(s)",
                throttle.consecutive_failures
            ));
        }
        if throttle.captcha_required {
            lines.push(self.yellow("         Captcha required for the next login"));
        }
        if let Some(secs) = throttle.retry_after_secs {
            lines.push(self.red(&format!("         Login blocked, retry after {secs}s")));
        }
        lines.join("\n")
    }

    /// Formats an error message.
    pub fn format_error(&self, context: &str, error: &str) -> String {
        format!("{}: {} - {}", self.bold(context), self.red("Error"), error)
    }

    // ========================================================================
    // Bars and times
    // ========================================================================

    /// Formats a progress bar.
    pub fn progress_bar(&self, percent_remaining: f64) -> String {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let filled = ((percent_remaining.clamp(0.0, 100.0) / 100.0) * self.bar_width as f64)
            .round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_percent(percent_remaining, &bar)
    }

    /// Formats how long ago `at` was.
    pub fn format_age(&self, at: DateTime<Utc>) -> String {
        let diff = Utc::now() - at;
        if diff < Duration::minutes(1) {
            "just now".to_string()
        } else if diff < Duration::hours(1) {
            let mins = diff.num_minutes();
            format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
        } else if diff < Duration::days(1) {
            let hours = diff.num_hours();
            format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
        } else {
            at.with_timezone(&Local).format("%Y-%m-%d").to_string()
        }
    }

    /// Formats a future instant as a countdown, or a local time beyond a day.
    fn format_until(&self, at: DateTime<Utc>) -> String {
        let now = Utc::now();
        if at <= now {
            return "now".to_string();
        }
        let diff = at - now;
        if diff < Duration::hours(1) {
            let mins = diff.num_minutes();
            format!("in {} minute{}", mins, if mins == 1 { "" } else { "s" })
        } else if diff < Duration::hours(24) {
            let hours = diff.num_hours();
            let mins = diff.num_minutes() % 60;
            if mins > 0 {
                format!("in {hours}h {mins}m")
            } else {
                format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
            }
        } else {
            at.with_timezone(&Local)
                .format("%a at %l:%M %p")
                .to_string()
                .trim()
                .to_string()
        }
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_percent(&self, percent: f64, text: &str) -> String {
        if !self.use_colors {
            return text.to_string();
        }

        if percent < 20.0 {
            self.red(text)
        } else if percent < 50.0 {
            self.yellow(text)
        } else {
            self.green(text)
        }
    }

    pub(crate) fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    pub(crate) fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    pub(crate) fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
