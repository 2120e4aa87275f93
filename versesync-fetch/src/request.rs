//! Transport-neutral request and response values.
//!
//! Requests are plain data so that callers can rebuild and resend them (the
//! single auth retry) and so tests can script responses without a socket.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use versesync_core::{ErrorEnvelope, QuotaKind, SyncError};

// ============================================================================
// Request
// ============================================================================

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// An outbound API call, relative to the configured base URL.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the base URL, starting with `/`.
    pub path: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
    /// Bearer token for the `Authorization` header.
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// Creates a request with no body, query, or credentials.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    /// GET `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// PATCH `path`.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    /// DELETE `path`.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends several query parameters.
    #[must_use]
    pub fn with_query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Sets a raw JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serializes `body` as the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, SyncError> {
        let value =
            serde_json::to_value(body).map_err(|e| SyncError::InvalidResponse(e.to_string()))?;
        Ok(self.with_body(value))
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

// Bearer tokens and bodies (passwords) stay out of logs.
impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("has_bearer", &self.bearer.is_some())
            .finish()
    }
}

// ============================================================================
// Response
// ============================================================================

/// A completed HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status code.
    pub status: u16,
    /// Parsed body. `Null` when empty, a JSON string when not JSON.
    pub body: Value,
    /// `Retry-After` header in seconds, if present.
    pub retry_after_secs: Option<u64>,
}

impl ApiResponse {
    /// Creates a response with a JSON body.
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            retry_after_secs: None,
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::InvalidResponse` if the body has the wrong shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SyncError> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            SyncError::InvalidResponse(format!("unexpected body for HTTP {}: {e}", self.status))
        })
    }

    /// Decodes the body of a successful response, or maps the failure.
    ///
    /// # Errors
    ///
    /// Returns the mapped error for non-2xx statuses, or
    /// `SyncError::InvalidResponse` if the body has the wrong shape.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, SyncError> {
        if self.is_success() {
            self.json()
        } else {
            Err(self.into_error())
        }
    }

    /// Parses the error envelope, if the body is one.
    pub fn envelope(&self) -> Option<ErrorEnvelope> {
        serde_json::from_value(self.body.clone()).ok()
    }

    /// Best available human-readable message for a failed response.
    pub fn error_message(&self) -> String {
        if let Some(env) = self.envelope() {
            return env.error.message;
        }
        match &self.body {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Object(map) => map
                .get("detail")
                .and_then(Value::as_str)
                .map_or_else(|| format!("HTTP {}", self.status), str::to_string),
            _ => format!("HTTP {}", self.status),
        }
    }

    /// Maps a non-success response onto the uniform taxonomy.
    ///
    /// Endpoint-specific meanings (login throttling, registration conflicts)
    /// are handled by the caller before falling back to this.
    pub fn into_error(self) -> SyncError {
        let message = self.error_message();
        let envelope = self.envelope();
        let code = envelope
            .as_ref()
            .map_or_else(|| "http_error".to_string(), |e| e.error.code.clone());
        let details = envelope.and_then(|e| e.error.details);

        match self.status {
            401 => SyncError::Unauthorized(message),
            410 => SyncError::SessionExpired,
            429 => SyncError::QuotaExceeded {
                kind: QuotaKind::from_message(&message),
                message,
            },
            400..=499 if code == "validation_error" || details.is_some() => {
                SyncError::Validation {
                    message,
                    details: details.unwrap_or_default(),
                }
            }
            status => SyncError::Http {
                status,
                code,
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(code: &str, message: &str) -> Value {
        json!({"error": {"code": code, "message": message}})
    }

    #[test]
    fn test_debug_hides_secrets() {
        let req = ApiRequest::post("/auth/login")
            .with_body(json!({"password": "hunter2hunter2"}))
            .with_bearer("tok-secret");
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(!dbg.contains("tok-secret"));
    }

    #[test]
    fn test_query_builders() {
        let req = ApiRequest::get("/bible/krv/search")
            .with_query("q", "love")
            .with_query("limit", 20);
        assert_eq!(req.query[1], ("limit".to_string(), "20".to_string()));
    }

    #[test]
    fn test_unauthorized_mapping() {
        let err = ApiResponse::new(401, envelope("http_error", "invalid token")).into_error();
        assert!(matches!(err, SyncError::Unauthorized(m) if m == "invalid token"));
    }

    #[test]
    fn test_gone_mapping() {
        let err = ApiResponse::new(410, envelope("http_error", "conversation expired")).into_error();
        assert!(matches!(err, SyncError::SessionExpired));
    }

    #[test]
    fn test_quota_mapping_by_message() {
        let daily = ApiResponse::new(429, envelope("http_error", "daily limit reached")).into_error();
        assert!(matches!(
            daily,
            SyncError::QuotaExceeded {
                kind: QuotaKind::Daily,
                ..
            }
        ));
        let trial = ApiResponse::new(429, envelope("http_error", "trial limit reached")).into_error();
        assert!(matches!(
            trial,
            SyncError::QuotaExceeded {
                kind: QuotaKind::Trial,
                ..
            }
        ));
    }

    #[test]
    fn test_validation_details_surface_verbatim() {
        let body = json!({"error": {
            "code": "validation_error",
            "message": "invalid request",
            "details": [{"loc": ["body", "book_id"], "msg": "field required"}]
        }});
        match ApiResponse::new(422, body).into_error() {
            SyncError::Validation { message, details } => {
                assert_eq!(message, "invalid request");
                assert_eq!(details[0]["msg"], "field required");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_other_status_is_http() {
        let err = ApiResponse::new(404, envelope("http_error", "chapter not found")).into_error();
        assert!(matches!(err, SyncError::Http { status: 404, .. }));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_message_without_envelope() {
        let resp = ApiResponse::new(502, Value::String("bad gateway".into()));
        assert_eq!(resp.error_message(), "bad gateway");
        assert_eq!(ApiResponse::new(500, Value::Null).error_message(), "HTTP 500");
    }

    #[test]
    fn test_into_result_decodes_success() {
        let value: UserSettingsProbe = ApiResponse::new(200, json!({"store_messages": true}))
            .into_result()
            .unwrap();
        assert!(value.store_messages);
    }

    #[derive(serde::Deserialize)]
    struct UserSettingsProbe {
        store_messages: bool,
    }
}
