//! Server API paths, relative to the configured base URL.

/// `POST` email/password login.
pub const AUTH_LOGIN: &str = "/auth/login";
/// `POST` account registration.
pub const AUTH_REGISTER: &str = "/auth/register";
/// `POST` refresh token rotation.
pub const AUTH_REFRESH: &str = "/auth/refresh";
/// `POST` server-side session revocation.
pub const AUTH_LOGOUT: &str = "/auth/logout";
/// `POST` start of the Google OAuth handshake.
pub const OAUTH_START: &str = "/auth/oauth/google/start";
/// `POST` OAuth authorization code exchange.
pub const OAUTH_EXCHANGE: &str = "/auth/oauth/google/exchange";

/// `GET|POST|DELETE` bookmarks.
pub const BOOKMARKS: &str = "/bible/bookmarks";
/// `GET|POST|DELETE` memos.
pub const MEMOS: &str = "/bible/memos";
/// `GET|PATCH` user settings.
pub const USER_SETTINGS: &str = "/users/me/settings";
/// `POST` conversation creation.
pub const CONVERSATIONS: &str = "/chat/conversations";

/// `GET` book list of a translation.
pub fn books(version_id: &str) -> String {
    format!("/bible/{version_id}/books")
}

/// `GET` one chapter.
pub fn chapter(version_id: &str, book_id: u32, chapter: u32) -> String {
    format!("/bible/{version_id}/books/{book_id}/chapters/{chapter}")
}

/// `GET` full-text search.
pub fn search(version_id: &str) -> String {
    format!("/bible/{version_id}/search")
}

/// `POST` a message to a conversation.
pub fn messages(conversation_id: &str) -> String {
    format!("{CONVERSATIONS}/{conversation_id}/messages")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(chapter("krv", 1, 3), "/bible/krv/books/1/chapters/3");
        assert_eq!(messages("c-9"), "/chat/conversations/c-9/messages");
        assert_eq!(search("eng-web"), "/bible/eng-web/search");
    }
}
