//! HTTP client facade for apps that run in a browser or inside a desktop shell
//!
//! One configured client serves the whole application. On the web it sends
//! requests through reqwest relative to a configurable base URL. Inside the
//! desktop shell it routes them through the shell's native fetch primitive
//! against a local backend, stripping the legacy `/api` path prefix.
//!
//! Every request carries the session's bearer token when there is one, and
//! anything but `GET` defaults to a JSON content type. Responses outside
//! `[200, 300)` are returned as [`HttpError::Status`] with the full response
//! attached, after being written to the log.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use desk_http::{Environment, HttpClient, MemorySessionStore};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Order {
//!     id: u64,
//! }
//!
//! async fn example() -> desk_http::Result<Vec<Order>> {
//!     let session = Arc::new(MemorySessionStore::new(Some("abc123".to_string())));
//!     let client = HttpClient::from_environment(&Environment::detect(), session)?;
//!     client.fetch("/orders").await
//! }
//! ```

mod client;
mod config;
mod environment;
mod error;
mod interceptor;
mod log_buffer;
mod request;
mod response;
mod session;
mod transport;

pub use client::{install_shared, is_success_status, shared, HttpClient, HttpClientBuilder};
pub use config::{
    is_absolute_url, resolve_base_url, ClientConfig, ClientSettings, PrefixRule, Settings,
    DEFAULT_TIMEOUT_MS, DEFAULT_WEB_BASE_URL, EMBEDDED_FALLBACK_BASE_URL, ENV_TIMEOUT_MS,
};
pub use environment::{
    Environment, EMBEDDED_MARKERS, ENV_EMBEDDED, ENV_EMBEDDED_BASE_URL, ENV_WEB_BASE_URL,
};
pub use error::HttpError;
pub use interceptor::{
    run_request_pipeline, run_response_pipeline, BearerAuth, DefaultContentType, ErrorLogger,
    PrefixRewrite, RequestInterceptor, ResponseInterceptor,
};
pub use log_buffer::{LogBuffer, LogBufferLayer, LogEntry, DEFAULT_QUERY_LIMIT};
pub use request::{RequestBuilder, RequestConfig, ResponseType};
pub use response::{Response, ResponseBody};
pub use session::{MemorySessionStore, NoSession, SessionStore};
pub use transport::{
    join_url, DefaultTransport, EmbeddedTransport, FetchInit, NativeFetch, NativeResponse,
    ReqwestFetch, Transport,
};

/// Result type of this crate
pub type Result<T, E = HttpError> = std::result::Result<T, E>;
