//! HTTP response types

use std::collections::HashMap;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use crate::error::HttpError;
use crate::request::{RequestConfig, ResponseType};
use crate::Result;

/// Decoded response body
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Parsed structured data
    Json(serde_json::Value),
    /// Text body
    Text(String),
    /// Raw bytes, kept as received
    Binary(Vec<u8>),
    /// No body
    Empty,
}

impl ResponseBody {
    /// Decode raw body bytes
    ///
    /// Binary hints win over the content type; JSON is only parsed when the
    /// server declares `application/json`. A body that does not parse is
    /// kept as text so the status and payload still reach the caller.
    pub fn decode(hint: ResponseType, content_type: &str, bytes: Vec<u8>) -> Self {
        if hint.is_binary() {
            return ResponseBody::Binary(bytes);
        }
        if hint == ResponseType::Json && content_type.contains("application/json") {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return ResponseBody::Empty;
            }
            match serde_json::from_slice(&bytes) {
                Ok(value) => return ResponseBody::Json(value),
                Err(e) => tracing::debug!("Response declared as JSON did not parse: {}", e),
            }
        }
        if bytes.is_empty() {
            return ResponseBody::Empty;
        }
        ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Body as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Short human-readable rendering for logs
    ///
    /// Text bodies are cut to `max_chars` characters.
    pub fn preview(&self, max_chars: usize) -> String {
        match self {
            ResponseBody::Text(text) => text.chars().take(max_chars).collect(),
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Binary(bytes) => format!("<{} bytes>", bytes.len()),
            ResponseBody::Empty => String::new(),
        }
    }
}

/// A received response together with the request that produced it
///
/// Immutable once created.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    status_text: String,
    headers: HeaderMap,
    body: ResponseBody,
    config: RequestConfig,
}

impl Response {
    /// Create a response
    pub fn new(
        status: u16,
        status_text: impl Into<String>,
        headers: HeaderMap,
        body: ResponseBody,
        config: RequestConfig,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers,
            body,
            config,
        }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Reason phrase sent with the status
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Check if the response status is a success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response status is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response status is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    /// Response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response headers as a plain name to value map
    pub fn header_map(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect()
    }

    /// `Content-Type` of the response, empty if absent
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Decoded body
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// The request that produced this response
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Deserialize the body
    ///
    /// Text bodies are parsed as JSON as a last resort, so servers that
    /// forget the content type still work.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.body {
            ResponseBody::Json(value) => Ok(T::deserialize(value)?),
            ResponseBody::Text(text) => Ok(serde_json::from_str(text)?),
            ResponseBody::Binary(bytes) => Ok(serde_json::from_slice(bytes)?),
            ResponseBody::Empty => Ok(serde_json::from_value(serde_json::Value::Null)?),
        }
    }

    /// Body rendered as text
    pub fn text(&self) -> String {
        match &self.body {
            ResponseBody::Text(text) => text.clone(),
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            ResponseBody::Empty => String::new(),
        }
    }

    /// Body as raw bytes
    pub fn bytes(&self) -> Vec<u8> {
        match &self.body {
            ResponseBody::Binary(bytes) => bytes.clone(),
            _ => self.text().into_bytes(),
        }
    }

    /// Turn a response outside the success range into an error
    pub(crate) fn into_result(self, is_success: fn(u16) -> bool) -> Result<Self> {
        if is_success(self.status) {
            Ok(self)
        } else {
            Err(HttpError::Status(Box::new(self)))
        }
    }
}
