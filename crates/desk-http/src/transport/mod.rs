//! Network transports
//!
//! The client talks to the network through a [`Transport`]. Which one is
//! used is decided once, when the client is built:
//!
//! - [`DefaultTransport`] drives reqwest directly.
//! - [`EmbeddedTransport`] goes through the desktop shell's native fetch
//!   primitive ([`NativeFetch`]).

use std::fmt::Debug;

use async_trait::async_trait;

use crate::config::is_absolute_url;
use crate::request::RequestConfig;
use crate::response::Response;
use crate::Result;

mod default;
mod embedded;

pub use default::DefaultTransport;
pub use embedded::{EmbeddedTransport, FetchInit, NativeFetch, NativeResponse, ReqwestFetch};

/// Sends one request and returns whatever the server answered
///
/// Transports do not judge the status code; the client does.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Dispatch `request` against `base_url`
    async fn dispatch(&self, base_url: &str, request: RequestConfig) -> Result<Response>;
}

/// Join a base URL and a request path with exactly one `/` between them
///
/// Absolute request URLs are returned as they are.
pub fn join_url(base_url: &str, path: &str) -> String {
    if is_absolute_url(path) {
        return path.to_string();
    }
    if path.is_empty() {
        return base_url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
