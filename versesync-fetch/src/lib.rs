// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `VerseSync` Fetch
//!
//! The HTTP seam of the `VerseSync` client.
//!
//! - [`transport::Transport`] - Trait every outbound call goes through
//! - [`transport::HttpTransport`] - `reqwest` implementation
//! - [`request::ApiRequest`] / [`request::ApiResponse`] - Transport-neutral
//!   request and response values
//! - [`endpoints`] - Path builders for the server API
//!
//! The transport never retries. Retry policy lives with the caller that
//! knows whether a request is safe to repeat.
//!
//! ## Example
//!
//! ```ignore
//! use versesync_fetch::{ApiRequest, HttpTransport, Transport, endpoints};
//!
//! let transport = HttpTransport::new("http://localhost:9000/v1", Duration::from_secs(30))?;
//! let response = transport.send(ApiRequest::get(endpoints::books("krv"))).await?;
//! let books: BookList = response.json()?;
//! ```

pub mod endpoints;
pub mod error;
pub mod request;
pub mod transport;

// Errors
pub use error::TransportError;

// Request/response values
pub use request::{ApiRequest, ApiResponse, Method};

// Transport
pub use transport::{HttpTransport, Transport};
