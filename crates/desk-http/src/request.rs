//! HTTP request configuration and builder

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::HttpClient;
use crate::error::HttpError;
use crate::response::Response;
use crate::Result;

/// How the body of a response should be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Structured data when the server says so, text otherwise
    #[default]
    Json,
    /// Always text
    Text,
    /// Raw bytes
    ArrayBuffer,
    /// Raw bytes
    Blob,
}

impl ResponseType {
    /// Whether the body must be kept as raw bytes
    pub fn is_binary(&self) -> bool {
        matches!(self, ResponseType::ArrayBuffer | ResponseType::Blob)
    }
}

/// A request as it travels through the interceptor pipeline
///
/// Request interceptors receive it by value and hand back the (possibly
/// modified) configuration. Once dispatched it is only read.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// HTTP method
    pub method: Method,
    /// Path relative to the base URL, or an absolute URL
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Raw request body
    pub body: Option<Vec<u8>>,
    /// Decoding hint for the response body
    pub response_type: ResponseType,
}

impl RequestConfig {
    /// Create a request with no headers and no body
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            response_type: ResponseType::default(),
        }
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or replace a header
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Whether a `Content-Type` header has been set
    pub fn has_content_type(&self) -> bool {
        self.headers.contains_key(CONTENT_TYPE)
    }
}

/// Fluent request builder returned by the client's verb methods
///
/// Errors raised while building (bad header, unserializable body) are held
/// back and returned by [`RequestBuilder::send`].
#[derive(Debug)]
pub struct RequestBuilder {
    client: HttpClient,
    config: RequestConfig,
    error: Option<HttpError>,
}

impl RequestBuilder {
    pub(crate) fn new(client: HttpClient, method: Method, url: &str) -> Self {
        Self {
            client,
            config: RequestConfig::new(method, url),
            error: None,
        }
    }

    /// Add a header to the request
    pub fn header(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if self.error.is_none() {
            if let Err(err) = self.config.set_header(key.as_ref(), value.as_ref()) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Merge a set of headers into the request
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.config.headers.extend(headers);
        self
    }

    /// Set the request body as JSON
    ///
    /// The content type is left to the interceptors unless set explicitly.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.config.body = Some(bytes),
            Err(e) => self.error = Some(HttpError::from(e)),
        }
        self
    }

    /// Set a raw request body
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.config.body = Some(body.into());
        self
    }

    /// Set the decoding hint for the response body
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.config.response_type = response_type;
        self
    }

    /// Access the request built so far
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Send the request through the client pipeline
    pub async fn send(self) -> Result<Response> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.client.request(self.config).await
    }

    /// Send the request and deserialize the response body
    pub async fn send_json<R: DeserializeOwned>(self) -> Result<R> {
        self.send().await?.json()
    }
}
