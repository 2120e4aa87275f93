//! Chat conversation handling.
//!
//! A conversation is created lazily on the first message and kept until the
//! server expires it (`410`), storage consent changes, or the session
//! changes identity. Quota is gated locally from the last server report and
//! updated from every response.

use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};
use versesync_core::{
    ChatReply, ConversationCreated, CreateConversationRequest, MessageRequest, QuotaKind,
    SessionState, SyncError,
};
use versesync_fetch::{ApiRequest, ApiResponse, endpoints};
use versesync_store::Preferences;

use crate::gateway::{CallKind, RequestGateway};
use crate::quota::QuotaReconciler;

/// One conversation with the assistant.
pub struct ChatSession {
    gateway: Arc<RequestGateway>,
    quota: Arc<QuotaReconciler>,
    preferences: Arc<Preferences>,
    locale: Option<String>,
    device_id: Option<String>,
    /// Held for the whole send so turns go out one at a time.
    conversation: Mutex<Conversation>,
}

/// The open conversation and the session identity it belongs to.
struct Conversation {
    id: Option<String>,
    identity: watch::Receiver<SessionState>,
}

impl Conversation {
    /// Drops the conversation if the session signed in, out, or switched
    /// user since it was opened. Returns true when it did.
    fn follow_identity(&mut self) -> bool {
        if !self.identity.has_changed().unwrap_or(false) {
            return false;
        }
        let signed_in = self.identity.borrow_and_update().is_signed_in();
        let dropped = self.id.take();
        info!(signed_in, dropped = ?dropped, "Session changed, conversation dropped");
        true
    }
}

impl ChatSession {
    /// Creates a chat session. `locale` overrides the UI language.
    /// `identity` follows the session; a change starts a fresh conversation
    /// with no quota carried over.
    pub fn new(
        gateway: Arc<RequestGateway>,
        quota: Arc<QuotaReconciler>,
        preferences: Arc<Preferences>,
        identity: watch::Receiver<SessionState>,
        locale: Option<String>,
        device_id: Option<String>,
    ) -> Self {
        Self {
            gateway,
            quota,
            preferences,
            locale,
            device_id,
            conversation: Mutex::new(Conversation { id: None, identity }),
        }
    }

    /// Identifier of the open conversation, if any.
    pub async fn conversation_id(&self) -> Option<String> {
        let mut conversation = self.conversation.lock().await;
        if conversation.follow_identity() {
            self.quota.on_session_reset();
        }
        conversation.id.clone()
    }

    /// Sends one user message, opening a conversation first if needed.
    ///
    /// # Errors
    ///
    /// - `SyncError::QuotaExceeded` when the last report shows a limit hit
    ///   (no request is sent) or the server answers `429`
    /// - `SyncError::SessionExpired` when the server expired the
    ///   conversation; the next send opens a new one
    /// - `SyncError::Validation` for an empty message
    #[instrument(skip(self, message))]
    pub async fn send(&self, message: &str) -> Result<ChatReply, SyncError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SyncError::Validation {
                message: "user_message required".to_string(),
                details: Vec::new(),
            });
        }

        let mut conversation = self.conversation.lock().await;
        if conversation.follow_identity() {
            self.quota.on_session_reset();
        }
        if let Some(kind) = self.quota.exhaustion() {
            debug!(%kind, "Quota exhausted, not sending");
            return Err(exhausted(kind));
        }

        let conversation_id = match conversation.id.as_ref() {
            Some(id) => id.clone(),
            None => {
                let id = self.create().await?;
                conversation.id = Some(id.clone());
                id
            }
        };

        let request = ApiRequest::post(endpoints::messages(&conversation_id)).with_json(
            &MessageRequest {
                user_message: message.to_string(),
            },
        )?;
        let response = self.gateway.send(CallKind::Mutation, request).await?;

        if response.status == 410 {
            warn!(%conversation_id, "Conversation expired");
            conversation.id = None;
            self.quota.on_session_reset();
            return Err(SyncError::SessionExpired);
        }
        let reply: ChatReply = self.absorb(response)?;
        self.quota.absorb(&reply.quota);
        Ok(reply)
    }

    /// Forgets the open conversation and the quota reported for it.
    pub async fn reset(&self) {
        let dropped = self.conversation.lock().await.id.take();
        self.quota.on_session_reset();
        if let Some(id) = dropped {
            info!(conversation_id = %id, "Conversation reset");
        }
    }

    async fn create(&self) -> Result<String, SyncError> {
        let values = self.preferences.get().await;
        let language = values.ui_language;
        let version_id = values
            .reading_position
            .map_or_else(|| language.default_version().to_string(), |p| p.version_id);

        let request = ApiRequest::post(endpoints::CONVERSATIONS).with_json(
            &CreateConversationRequest {
                device_id: self.device_id.clone(),
                locale: Some(
                    self.locale
                        .clone()
                        .unwrap_or_else(|| language.as_str().to_string()),
                ),
                version_id,
                store_messages: values.storage_consent.store_messages,
            },
        )?;
        let response = self.gateway.send(CallKind::Mutation, request).await?;
        let created: ConversationCreated = self.absorb(response)?;
        self.quota.absorb(&created.quota);

        info!(
            conversation_id = %created.conversation_id,
            store_messages = created.store_messages,
            "Conversation opened"
        );
        Ok(created.conversation_id)
    }

    /// Decodes a response, recording a `429` as the named limit exhausted.
    fn absorb<T: serde::de::DeserializeOwned>(&self, response: ApiResponse) -> Result<T, SyncError> {
        response.into_result().inspect_err(|e| {
            if let SyncError::QuotaExceeded { kind, .. } = e {
                self.quota.absorb_exhausted(*kind);
            }
        })
    }
}

fn exhausted(kind: QuotaKind) -> SyncError {
    let message = match kind {
        QuotaKind::Trial => "trial turn limit reached",
        QuotaKind::Daily => "daily turn limit reached",
    };
    SyncError::QuotaExceeded {
        kind,
        message: message.to_string(),
    }
}
