//! Transport for the desktop shell
//!
//! Inside the shell, requests go through the host's native fetch primitive
//! instead of the regular client stack.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::instrument;

use super::Transport;
use crate::config::is_absolute_url;
use crate::error::HttpError;
use crate::request::RequestConfig;
use crate::response::{Response, ResponseBody};
use crate::Result;

/// Characters of a text body shown in debug logs
const BODY_PREVIEW_CHARS: usize = 200;

/// Options passed to the native fetch primitive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchInit {
    /// Upper-case HTTP method
    pub method: String,
    /// Request headers
    pub headers: Vec<(String, String)>,
    /// Raw request body
    pub body: Option<Vec<u8>>,
}

/// Response produced by the native fetch primitive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase
    pub status_text: String,
    /// Response headers in received order
    pub headers: Vec<(String, String)>,
    /// Raw body
    pub body: Vec<u8>,
}

impl NativeResponse {
    /// Value of the first header called `name`, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The desktop shell's fetch primitive
#[async_trait]
pub trait NativeFetch: Send + Sync + Debug {
    /// Fetch `url`
    async fn fetch(&self, url: &str, init: FetchInit) -> Result<NativeResponse>;
}

/// Native fetch backed by reqwest, as the shell's HTTP plugin is
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetch {
    inner: reqwest::Client,
}

impl ReqwestFetch {
    /// Create a fetch primitive whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpError::from)?;
        Ok(Self { inner: client })
    }

    /// Create a fetch primitive from a configured reqwest::Client
    pub fn from_reqwest(client: reqwest::Client) -> Self {
        Self { inner: client }
    }
}

#[async_trait]
impl NativeFetch for ReqwestFetch {
    async fn fetch(&self, url: &str, init: FetchInit) -> Result<NativeResponse> {
        let method = reqwest::Method::from_bytes(init.method.as_bytes())
            .map_err(|e| HttpError::Build(format!("Invalid method '{}': {}", init.method, e)))?;

        let mut request = self.inner.request(method, url);
        for (key, value) in &init.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = init.body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(HttpError::from)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();
        let body = response.bytes().await.map_err(HttpError::from)?.to_vec();

        Ok(NativeResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            headers,
            body,
        })
    }
}

/// Transport that routes every request through a [`NativeFetch`]
#[derive(Debug, Clone, Default)]
pub struct EmbeddedTransport<F = ReqwestFetch> {
    fetch: F,
}

impl<F: NativeFetch> EmbeddedTransport<F> {
    /// Wrap a fetch primitive
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }

    /// The wrapped fetch primitive
    pub fn native(&self) -> &F {
        &self.fetch
    }
}

fn to_header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => tracing::warn!("Dropping malformed response header '{}'", key),
        }
    }
    map
}

#[async_trait]
impl<F: NativeFetch> Transport for EmbeddedTransport<F> {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn dispatch(&self, base_url: &str, request: RequestConfig) -> Result<Response> {
        let url = if is_absolute_url(&request.url) {
            request.url.clone()
        } else {
            format!("{}{}", base_url, request.url)
        };

        let init = FetchInit {
            method: request.method.as_str().to_uppercase(),
            headers: request
                .headers
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                .collect(),
            body: request.body.clone(),
        };

        let native = self.fetch.fetch(&url, init).await?;

        let content_type = native.header("content-type").unwrap_or("").to_string();
        let body = ResponseBody::decode(request.response_type, &content_type, native.body);

        tracing::debug!(
            "[HTTP] {} {} {} {}",
            native.status,
            url,
            content_type,
            body.preview(BODY_PREVIEW_CHARS)
        );

        Ok(Response::new(
            native.status,
            native.status_text,
            to_header_map(&native.headers),
            body,
            request,
        ))
    }
}
