//! Transport error types.

use thiserror::Error;
use versesync_core::SyncError;

/// Failure to complete an HTTP exchange at all.
///
/// A response with a non-success status is not a transport error; it comes
/// back as an [`ApiResponse`](crate::ApiResponse) for the caller to map.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be sent or the response could not be read.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        SyncError::Network(err.to_string())
    }
}
