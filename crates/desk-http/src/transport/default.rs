//! reqwest-based transport

use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use super::{join_url, Transport};
use crate::error::HttpError;
use crate::request::RequestConfig;
use crate::response::{Response, ResponseBody};
use crate::Result;

/// Transport used outside the desktop shell
#[derive(Debug, Clone)]
pub struct DefaultTransport {
    inner: reqwest::Client,
}

impl Default for DefaultTransport {
    fn default() -> Self {
        Self::from_reqwest(reqwest::Client::new())
    }
}

impl DefaultTransport {
    /// Create a transport whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpError::from)?;
        Ok(Self { inner: client })
    }

    /// Create a transport from a configured reqwest::Client
    pub fn from_reqwest(client: reqwest::Client) -> Self {
        Self { inner: client }
    }
}

#[async_trait]
impl Transport for DefaultTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn dispatch(&self, base_url: &str, request: RequestConfig) -> Result<Response> {
        let url = join_url(base_url, &request.url);
        let url = url::Url::parse(&url)
            .map_err(|e| HttpError::Build(format!("Invalid request URL '{}': {}", url, e)))?;

        let mut builder = self
            .inner
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(HttpError::from)?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("Unknown").to_string();
        let headers = response.headers().clone();
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = response.bytes().await.map_err(HttpError::from)?.to_vec();
        let body = ResponseBody::decode(request.response_type, &content_type, bytes);

        Ok(Response::new(
            status.as_u16(),
            status_text,
            headers,
            body,
            request,
        ))
    }
}
