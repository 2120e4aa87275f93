//! Content, chat, and library behavior through the client facade.

use serde_json::{Value, json};
use std::sync::Arc;
use versesync_core::{
    ChapterKey, ContentNotice, CredentialPair, QuotaKind, SyncError, UiLanguage, Verse, VerseRef,
};
use versesync_fetch::{ApiResponse, Method, endpoints};
use versesync_store::{
    ClientConfig, CredentialStore, KeyValueStore, KvCredentialStore, MemoryStore,
};
use versesync_sync::testing::{ScriptedTransport, error_body};
use versesync_sync::{RefreshOutcome, SyncClient};

async fn client_with(transport: Arc<ScriptedTransport>, config: ClientConfig) -> SyncClient {
    let store = Arc::new(MemoryStore::new());
    let credentials: Arc<dyn CredentialStore> = Arc::new(KvCredentialStore::new(store.clone()));
    SyncClient::with_parts(config, store, transport, credentials)
        .await
        .unwrap()
}

async fn client(transport: Arc<ScriptedTransport>) -> SyncClient {
    client_with(transport, ClientConfig::default()).await
}

fn chapter(text: &str) -> Value {
    chapter_with_hash(&format!("hash-{text}"), text)
}

fn chapter_with_hash(hash: &str, text: &str) -> Value {
    let verses = vec![Verse::new(1, text), Verse::new(2, format!("{text}, again"))];
    json!({"content_hash": hash, "verses": verses})
}

// ============================================================================
// Content
// ============================================================================

#[tokio::test]
async fn test_changed_hash_fires_one_update() {
    let transport = Arc::new(ScriptedTransport::new());
    let path = endpoints::chapter("krv", 1, 1);
    transport.push(
        Method::Get,
        &path,
        200,
        json!({"content_hash": "abc", "verses": [{"verse": 1, "text": "태초에"}]}),
    );
    transport.push(
        Method::Get,
        &path,
        200,
        json!({"content_hash": "def", "verses": [{"verse": 1, "text": "태초에 하나님이"}]}),
    );
    let client = client(transport).await;
    let mut notices = client.content().subscribe();
    let key = ChapterKey::new("krv", 1, 1);

    let (cached, outcome) = client.open_chapter(&key).await.unwrap();
    assert!(cached.is_none());
    assert!(matches!(outcome, RefreshOutcome::Fresh(ref e) if e.content_hash == "abc"));
    assert_eq!(client.content().cache().len().await, 1);

    let (cached, outcome) = client.open_chapter(&key).await.unwrap();
    assert_eq!(cached.unwrap().content_hash, "abc");
    assert!(matches!(outcome, RefreshOutcome::Updated(_)));

    let notice = notices.try_recv().unwrap();
    assert_eq!(
        notice,
        ContentNotice::Updated {
            key: key.clone(),
            content_hash: "def".to_string(),
        }
    );
    assert!(notices.try_recv().is_err());

    let entry = client.content().cached(&key).await.unwrap().unwrap();
    assert_eq!(entry.content_hash, "def");
    assert_eq!(entry.verses[0].text, "태초에 하나님이");
    assert_eq!(
        client.preferences().reading_position().await.unwrap().key(),
        key
    );
}

#[tokio::test]
async fn test_offline_keeps_cached_copy() {
    let transport = Arc::new(ScriptedTransport::new());
    let path = endpoints::chapter("krv", 19, 23);
    transport.push(Method::Get, &path, 200, chapter("여호와는 나의 목자시니"));
    let client = client(transport.clone()).await;
    let key = ChapterKey::new("krv", 19, 23);
    client.open_chapter(&key).await.unwrap();

    let mut notices = client.content().subscribe();
    transport.set_offline(true);
    let (cached, outcome) = client.open_chapter(&key).await.unwrap();

    let RefreshOutcome::Offline { entry, .. } = outcome else {
        panic!("expected offline outcome, got {outcome:?}");
    };
    assert_eq!(Some(entry), cached);
    assert!(matches!(
        notices.try_recv().unwrap(),
        ContentNotice::Offline { key: k, .. } if k == key
    ));
}

#[tokio::test]
async fn test_offline_without_cache_is_hard_error() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.set_offline(true);
    let client = client(transport).await;

    let err = client
        .open_chapter(&ChapterKey::new("krv", 1, 1))
        .await
        .unwrap_err();
    assert!(err.is_network());
}

#[tokio::test]
async fn test_superseded_refresh_writes_own_key_silently() {
    let transport = Arc::new(ScriptedTransport::new());
    let genesis = ChapterKey::new("krv", 1, 1);
    let exodus = ChapterKey::new("krv", 2, 1);
    transport.push(Method::Get, &endpoints::chapter("krv", 1, 1), 200, chapter("old"));
    transport.push(Method::Get, &endpoints::chapter("krv", 1, 1), 200, chapter("new"));
    let client = client(transport).await;
    let content = client.content();
    content.refresh(&genesis).await.unwrap();

    let mut notices = content.subscribe();
    let (_, refresh) = content.load(genesis.clone()).await.unwrap();
    content.select(exodus.clone()).await;
    let outcome = refresh.await.unwrap();

    assert_eq!(outcome, RefreshOutcome::Superseded);
    assert!(notices.try_recv().is_err());
    let entry = content.cached(&genesis).await.unwrap().unwrap();
    assert_eq!(entry.verses[0].text, "new");
    assert!(content.cached(&exodus).await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_hash_decides_unchanged() {
    let transport = Arc::new(ScriptedTransport::new());
    let path = endpoints::chapter("eng-web", 1, 1);
    transport.push(Method::Get, &path, 200, chapter_with_hash("abc", "in the beginning"));
    transport.push(Method::Get, &path, 200, chapter_with_hash("abc", "in the end"));
    let client = client(transport).await;
    let key = ChapterKey::new("eng-web", 1, 1);
    client.content().refresh(&key).await.unwrap();

    let mut notices = client.content().subscribe();
    let outcome = client.content().refresh(&key).await.unwrap();

    assert!(matches!(outcome, RefreshOutcome::Unchanged(ref e) if e.content_hash == "abc"));
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn test_two_hundred_and_first_chapter_evicts_first() {
    let transport = Arc::new(ScriptedTransport::new());
    for chapter_no in 1..=201 {
        transport.push(
            Method::Get,
            &endpoints::chapter("krv", 19, chapter_no),
            200,
            chapter(&format!("psalm {chapter_no}")),
        );
    }
    let client = client(transport).await;
    let content = client.content();

    for chapter_no in 1..=200 {
        content
            .refresh(&ChapterKey::new("krv", 19, chapter_no))
            .await
            .unwrap();
    }
    assert_eq!(content.cache().len().await, 200);

    content
        .refresh(&ChapterKey::new("krv", 19, 201))
        .await
        .unwrap();
    assert_eq!(content.cache().len().await, 200);
    assert!(!content.cache().contains(&ChapterKey::new("krv", 19, 1)).await);
    assert!(content.cache().contains(&ChapterKey::new("krv", 19, 2)).await);
}

#[tokio::test]
async fn test_clear_cache() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(Method::Get, &endpoints::chapter("krv", 1, 1), 200, chapter("a"));
    let client = client(transport).await;
    client.content().refresh(&ChapterKey::new("krv", 1, 1)).await.unwrap();

    assert_eq!(client.clear_cache().await.unwrap(), 1);
    assert!(client.store().keys_with_prefix("cache:").await.unwrap().is_empty());
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_expired_conversation_is_recreated() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(
        Method::Post,
        endpoints::CONVERSATIONS,
        200,
        json!({"conversation_id": "c1", "remaining_turns": 8}),
    );
    transport.push(
        Method::Post,
        endpoints::CONVERSATIONS,
        200,
        json!({"conversation_id": "c2"}),
    );
    transport.push(
        Method::Post,
        &endpoints::messages("c1"),
        410,
        error_body("http_error", "conversation expired"),
    );
    transport.push(
        Method::Post,
        &endpoints::messages("c2"),
        200,
        json!({"assistant_message": "welcome back", "remaining_turns": 7}),
    );
    let client = client(transport.clone()).await;

    let err = client.chat().send("first").await.unwrap_err();
    assert!(matches!(err, SyncError::SessionExpired));
    assert!(client.chat().conversation_id().await.is_none());
    assert!(!client.quota().snapshot().has_data());

    let reply = client.chat().send("second").await.unwrap();
    assert_eq!(reply.assistant_message, "welcome back");
    assert_eq!(client.chat().conversation_id().await.as_deref(), Some("c2"));
    assert_eq!(client.quota().snapshot().remaining_turns, Some(7));
    assert_eq!(transport.count(Method::Post, endpoints::CONVERSATIONS), 2);
}

#[tokio::test]
async fn test_exhausted_quota_blocks_without_request() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(
        Method::Post,
        endpoints::CONVERSATIONS,
        200,
        json!({"conversation_id": "c1", "turn_limit": 3, "turn_count": 2, "remaining_turns": 1}),
    );
    transport.push(
        Method::Post,
        &endpoints::messages("c1"),
        200,
        json!({"assistant_message": "amen", "turn_count": 3, "remaining_turns": 0}),
    );
    let client = client(transport.clone()).await;

    client.chat().send("last one").await.unwrap();
    assert!(client.quota().is_exhausted());

    let err = client.chat().send("one more").await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::QuotaExceeded {
            kind: QuotaKind::Trial,
            ..
        }
    ));
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_server_429_daily_is_recorded() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(Method::Post, endpoints::CONVERSATIONS, 200, json!({"conversation_id": "c1"}));
    transport.push(
        Method::Post,
        &endpoints::messages("c1"),
        429,
        error_body("http_error", "daily turn limit reached"),
    );
    let client = client(transport).await;

    let err = client.chat().send("hello").await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::QuotaExceeded {
            kind: QuotaKind::Daily,
            ..
        }
    ));
    assert_eq!(client.quota().exhaustion(), Some(QuotaKind::Daily));
    assert_eq!(client.chat().conversation_id().await.as_deref(), Some("c1"));
}

#[tokio::test]
async fn test_sign_in_lifts_trial_limit() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(Method::Post, endpoints::CONVERSATIONS, 200, json!({"conversation_id": "c1"}));
    transport.push(
        Method::Post,
        &endpoints::messages("c1"),
        429,
        error_body("http_error", "trial limit reached, please sign in"),
    );
    transport.push(
        Method::Post,
        endpoints::AUTH_LOGIN,
        200,
        json!({"user_id": "u1", "session_token": "access-1"}),
    );
    transport.push(
        Method::Post,
        endpoints::CONVERSATIONS,
        200,
        json!({"conversation_id": "c2", "daily_turn_limit": 50, "daily_remaining": 50}),
    );
    transport.push(
        Method::Post,
        &endpoints::messages("c2"),
        200,
        json!({"assistant_message": "welcome", "daily_remaining": 49}),
    );
    let client = client(transport.clone()).await;

    let err = client.chat().send("hi").await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::QuotaExceeded {
            kind: QuotaKind::Trial,
            ..
        }
    ));
    assert_eq!(client.quota().exhaustion(), Some(QuotaKind::Trial));

    client
        .session()
        .login("reader@example.com", "correct horse battery", None)
        .await
        .unwrap();

    let reply = client.chat().send("hi after sign-in").await.unwrap();
    assert_eq!(reply.assistant_message, "welcome");
    assert_eq!(client.chat().conversation_id().await.as_deref(), Some("c2"));
    assert_eq!(client.quota().exhaustion(), None);
    assert_eq!(client.quota().snapshot().daily_remaining, Some(49));

    let create = &transport.requests()[3];
    assert_eq!(create.path, endpoints::CONVERSATIONS);
    assert_eq!(create.bearer.as_deref(), Some("access-1"));
    assert_eq!(transport.requests().len(), 5);
}

#[tokio::test]
async fn test_consent_change_resets_conversation() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.route(Method::Post, endpoints::CONVERSATIONS, |req| {
        let store = req.body.as_ref().is_some_and(|b| b["store_messages"] == true);
        let id = if store { "kept" } else { "ephemeral" };
        ApiResponse::new(200, json!({"conversation_id": id, "store_messages": store}))
    });
    transport.route(Method::Post, &endpoints::messages("ephemeral"), |_| {
        ApiResponse::new(200, json!({"assistant_message": "ok"}))
    });
    transport.route(Method::Post, &endpoints::messages("kept"), |_| {
        ApiResponse::new(200, json!({"assistant_message": "ok"}))
    });
    let client = client(transport.clone()).await;

    client.chat().send("one").await.unwrap();
    assert_eq!(
        client.chat().conversation_id().await.as_deref(),
        Some("ephemeral")
    );

    assert!(client.set_storage_consent(true).await.unwrap());
    assert!(client.chat().conversation_id().await.is_none());
    assert!(!client.set_storage_consent(true).await.unwrap());

    client.chat().send("two").await.unwrap();
    assert_eq!(client.chat().conversation_id().await.as_deref(), Some("kept"));
}

#[tokio::test]
async fn test_locale_follows_language_unless_configured() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.route(Method::Post, endpoints::CONVERSATIONS, |_| {
        ApiResponse::new(200, json!({"conversation_id": "c1"}))
    });
    transport.route(Method::Post, &endpoints::messages("c1"), |_| {
        ApiResponse::new(200, json!({"assistant_message": "ok"}))
    });
    let client = client(transport.clone()).await;
    client
        .preferences()
        .set_ui_language(UiLanguage::En)
        .await
        .unwrap();
    client.chat().send("hi").await.unwrap();

    let create = transport.requests()[0].body.clone().unwrap();
    assert_eq!(create["locale"], "en");
    assert_eq!(create["version_id"], "eng-web");

    let transport = Arc::new(ScriptedTransport::new());
    transport.route(Method::Post, endpoints::CONVERSATIONS, |_| {
        ApiResponse::new(200, json!({"conversation_id": "c1"}))
    });
    transport.route(Method::Post, &endpoints::messages("c1"), |_| {
        ApiResponse::new(200, json!({"assistant_message": "ok"}))
    });
    let config = ClientConfig {
        locale: Some("ko-KR".into()),
        ..ClientConfig::default()
    };
    let client = client_with(transport.clone(), config).await;
    client.chat().send("안녕").await.unwrap();
    let create = transport.requests()[0].body.clone().unwrap();
    assert_eq!(create["locale"], "ko-KR");
    assert_eq!(create["version_id"], "krv");
}

// ============================================================================
// Library
// ============================================================================

#[tokio::test]
async fn test_library_mutations() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(Method::Post, endpoints::BOOKMARKS, 200, json!({"created": true}));
    transport.push(Method::Post, endpoints::BOOKMARKS, 200, json!({"created": false}));
    transport.push(Method::Post, endpoints::MEMOS, 200, json!({"saved": true}));
    transport.push(Method::Delete, endpoints::MEMOS, 200, json!({"deleted": false}));
    transport.push(
        Method::Patch,
        endpoints::USER_SETTINGS,
        200,
        json!({"store_messages": true}),
    );
    let store = Arc::new(MemoryStore::new());
    KvCredentialStore::new(store.clone())
        .save(&CredentialPair {
            access_token: "access-1".into(),
            refresh_token: None,
            user_id: "u1".into(),
            email: None,
            expires_at: None,
        })
        .await
        .unwrap();
    let credentials: Arc<dyn CredentialStore> = Arc::new(KvCredentialStore::new(store.clone()));
    let client = SyncClient::with_parts(
        ClientConfig::default(),
        store,
        transport.clone(),
        credentials,
    )
    .await
    .unwrap();
    let library = client.library();
    let target = VerseRef::new("krv", 43, 3, 16);

    assert!(library.add_bookmark(&target).await.unwrap());
    assert!(!library.add_bookmark(&target).await.unwrap());
    assert!(library.save_memo(&target, "for God so loved").await.unwrap());
    assert!(!library.delete_memo(&target).await.unwrap());
    assert!(library.update_settings(true).await.unwrap().store_messages);

    let requests = transport.requests();
    assert_eq!(requests.len(), 5);
    assert!(requests.iter().all(|r| r.bearer.as_deref() == Some("access-1")));
    assert_eq!(requests[2].body.clone().unwrap()["memo_text"], "for God so loved");
    assert_eq!(requests[2].body.clone().unwrap()["book_id"], 43);
}

#[tokio::test]
async fn test_anonymous_library_call_is_unauthorized() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push(
        Method::Get,
        endpoints::BOOKMARKS,
        401,
        error_body("http_error", "auth required"),
    );
    let client = client(transport.clone()).await;

    let err = client.library().bookmarks("krv").await.unwrap_err();
    assert!(matches!(err, SyncError::Unauthorized(m) if m == "auth required"));
    assert!(transport.requests()[0].bearer.is_none());
}

// ============================================================================
// Restart
// ============================================================================

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = ClientConfig {
        data_dir: Some(dir.path().to_path_buf()),
        ..ClientConfig::default()
    };

    {
        let client = SyncClient::open(config.clone()).await.unwrap();
        assert!(!client.session().state().is_signed_in());
        KvCredentialStore::new(client.store().clone())
            .save(&CredentialPair {
                access_token: "access-1".into(),
                refresh_token: None,
                user_id: "u1".into(),
                email: Some("reader@example.com".into()),
                expires_at: None,
            })
            .await
            .unwrap();
        assert!(client.set_storage_consent(true).await.unwrap());
        client
            .preferences()
            .set_ui_language(UiLanguage::En)
            .await
            .unwrap();
    }

    let client = SyncClient::open(config).await.unwrap();
    assert!(client.session().state().is_signed_in());
    assert!(client.preferences().storage_consent().await.store_messages);
    assert_eq!(client.preferences().ui_language().await, UiLanguage::En);
    assert!(dir.path().join("state.json").exists());
}
