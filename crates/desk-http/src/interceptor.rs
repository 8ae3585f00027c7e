//! Request and response interceptors
//!
//! Interceptors run in the order they were registered. A request interceptor
//! that fails stops the pipeline and its error reaches the caller as is.
//! Response interceptors see the outcome of the dispatch, success or failure,
//! and hand an outcome to the next one.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use crate::config::PrefixRule;
use crate::error::HttpError;
use crate::request::RequestConfig;
use crate::response::Response;
use crate::session::SessionStore;
use crate::Result;

/// Characters of a failed response body written to the log
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Runs before a request is dispatched
#[async_trait]
pub trait RequestInterceptor: Send + Sync + Debug {
    /// Inspect or modify the request
    async fn on_request(&self, request: RequestConfig) -> Result<RequestConfig>;
}

/// Runs after a response (or failure) is received
#[async_trait]
pub trait ResponseInterceptor: Send + Sync + Debug {
    /// Inspect or replace the outcome
    async fn on_response(&self, outcome: Result<Response>) -> Result<Response>;
}

/// Run `request` through `interceptors`, stopping at the first failure
pub async fn run_request_pipeline(
    interceptors: &[Arc<dyn RequestInterceptor>],
    mut request: RequestConfig,
) -> Result<RequestConfig> {
    for interceptor in interceptors {
        request = interceptor.on_request(request).await?;
    }
    Ok(request)
}

/// Run `outcome` through `interceptors`
pub async fn run_response_pipeline(
    interceptors: &[Arc<dyn ResponseInterceptor>],
    mut outcome: Result<Response>,
) -> Result<Response> {
    for interceptor in interceptors {
        outcome = interceptor.on_response(outcome).await;
    }
    outcome
}

/// Strips a legacy path prefix from request URLs
#[derive(Debug, Clone, Default)]
pub struct PrefixRewrite {
    rule: PrefixRule,
}

impl PrefixRewrite {
    /// Rewrite with `rule`
    pub fn new(rule: PrefixRule) -> Self {
        Self { rule }
    }
}

#[async_trait]
impl RequestInterceptor for PrefixRewrite {
    async fn on_request(&self, mut request: RequestConfig) -> Result<RequestConfig> {
        if let Some(url) = self.rule.apply(&request.url) {
            tracing::trace!("Rewrote request path {} -> {}", request.url, url);
            request.url = url;
        }
        Ok(request)
    }
}

/// Adds `Authorization: Bearer <token>` when the session has a token
#[derive(Debug, Clone)]
pub struct BearerAuth {
    store: Arc<dyn SessionStore>,
}

impl BearerAuth {
    /// Read tokens from `store`
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RequestInterceptor for BearerAuth {
    async fn on_request(&self, mut request: RequestConfig) -> Result<RequestConfig> {
        let token = self.store.token().await?;
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| HttpError::Interceptor(format!("Invalid session token: {}", e)))?;
            request.headers.insert(AUTHORIZATION, value);
        }
        Ok(request)
    }
}

/// Defaults `Content-Type` to `application/json` on anything but `GET`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContentType;

#[async_trait]
impl RequestInterceptor for DefaultContentType {
    async fn on_request(&self, mut request: RequestConfig) -> Result<RequestConfig> {
        if !request.has_content_type() && request.method != Method::GET {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        Ok(request)
    }
}

/// Logs failed requests and passes every outcome on untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorLogger;

#[async_trait]
impl ResponseInterceptor for ErrorLogger {
    async fn on_response(&self, outcome: Result<Response>) -> Result<Response> {
        if let Err(err) = &outcome {
            match err.response() {
                Some(response) => tracing::error!(
                    status = response.status(),
                    url = %response.config().url,
                    "[HTTP ERR] {}",
                    response.body().preview(ERROR_BODY_PREVIEW_CHARS)
                ),
                None => tracing::error!("[HTTP ERR] {}", err),
            }
        }
        outcome
    }
}
