//! Request gateway.
//!
//! Every identity-bearing call goes through [`RequestGateway::send`], which
//! attaches the current access token and applies the single
//! refresh-and-retry rule on `401`. The transport below never retries, so a
//! mutation is sent at most twice: once, and once more after a refresh.

use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};
use versesync_core::{CredentialPair, SyncError};
use versesync_fetch::{ApiRequest, ApiResponse, Transport};

use crate::session::SessionManager;

/// Whether a call only reads or has side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Idempotent read.
    Read,
    /// Creates, updates, or deletes something.
    Mutation,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Mutation => f.write_str("mutation"),
        }
    }
}

/// Authorizes outbound calls and maps their failures.
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
}

impl RequestGateway {
    /// Creates a gateway sending through `transport` with credentials from
    /// `session`.
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionManager>) -> Self {
        Self { transport, session }
    }

    /// Sends `request` and returns the raw response.
    ///
    /// A `401` on a call made with a refreshable pair triggers one refresh
    /// and one retry. Whatever the retry returns is handed back unchanged.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Network` on transport failure, or the refresh
    /// error when rotation fails.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send(&self, kind: CallKind, request: ApiRequest) -> Result<ApiResponse, SyncError> {
        let creds = self.session.credentials().await;
        let response = self.dispatch(&request, creds.as_ref()).await?;
        if response.status != 401 {
            return Ok(response);
        }

        let Some(creds) = creds.filter(CredentialPair::can_refresh) else {
            debug!(%kind, "401 without a refresh token");
            return Ok(response);
        };

        debug!(%kind, "401, refreshing and retrying once");
        let rotated = self
            .session
            .refresh_after_unauthorized(creds.refresh_token.as_deref())
            .await?;
        self.dispatch(&request, Some(&rotated)).await
    }

    /// Sends `request` and decodes a successful body.
    ///
    /// # Errors
    ///
    /// Returns the mapped error for any non-success status, plus everything
    /// [`RequestGateway::send`] can return.
    pub async fn call<T: DeserializeOwned>(
        &self,
        kind: CallKind,
        request: ApiRequest,
    ) -> Result<T, SyncError> {
        self.send(kind, request).await?.into_result()
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        creds: Option<&CredentialPair>,
    ) -> Result<ApiResponse, SyncError> {
        let mut outbound = request.clone();
        outbound.bearer = creds.map(|c| c.access_token.clone());
        Ok(self.transport.send(outbound).await?)
    }
}
