//! In-process scripted transport.
//!
//! Replies are looked up per `(method, path)`: queued one-shot responses
//! first, then a routing closure, then a `404` envelope. Every request is
//! recorded so tests can count how often an endpoint was hit.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use versesync_fetch::{ApiRequest, ApiResponse, Method, Transport, TransportError};

type Route = Box<dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync>;

/// Transport answering from a script instead of a socket.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<(Method, String), VecDeque<ApiResponse>>>,
    routes: Mutex<HashMap<(Method, String), Route>>,
    log: Mutex<Vec<ApiRequest>>,
    offline: AtomicBool,
}

impl ScriptedTransport {
    /// Creates an empty script. Unscripted requests receive `404`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one response for the next matching request.
    pub fn push(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push_response(method, path, ApiResponse::new(status, body));
    }

    /// Queues a prepared response for the next matching request.
    pub fn push_response(&self, method: Method, path: &str, response: ApiResponse) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    /// Answers every matching request with `handler`, once the queue for
    /// that endpoint is drained.
    pub fn route<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method, path.to_string()), Box::new(handler));
    }

    /// While set, every send fails as a timeout.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests sent to `(method, path)`.
    pub fn count(&self, method: Method, path: &str) -> usize {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    fn reply(&self, request: &ApiRequest) -> ApiResponse {
        let key = (request.method, request.path.clone());
        if let Some(response) = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        if let Some(route) = self
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return route(request);
        }
        ApiResponse::new(
            404,
            json!({"error": {"code": "http_error", "message": "not found"}}),
        )
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        // Let concurrently issued requests interleave like real I/O.
        tokio::task::yield_now().await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Timeout);
        }
        Ok(self.reply(&request))
    }
}

/// Builds an error envelope body.
pub fn error_body(code: &str, message: &str) -> Value {
    json!({"error": {"code": code, "message": message}})
}
