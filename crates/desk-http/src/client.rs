//! HTTP client facade

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::config::{ClientConfig, Settings};
use crate::environment::Environment;
use crate::error::HttpError;
use crate::interceptor::{
    run_request_pipeline, run_response_pipeline, BearerAuth, DefaultContentType, ErrorLogger,
    PrefixRewrite, RequestInterceptor, ResponseInterceptor,
};
use crate::request::{RequestBuilder, RequestConfig};
use crate::response::Response;
use crate::session::SessionStore;
use crate::transport::{DefaultTransport, EmbeddedTransport, ReqwestFetch, Transport};
use crate::Result;

static SHARED: OnceCell<HttpClient> = OnceCell::new();

/// Default success predicate: status in `[200, 300)`
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

#[derive(Debug)]
struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    validate_status: fn(u16) -> bool,
}

/// HTTP client
///
/// Cheap to clone; clones share transport, configuration and interceptors.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

impl HttpClient {
    /// Create a new HTTP client builder
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Build the client for the detected platform
    ///
    /// Resolves the base URL, selects the transport and installs the
    /// standard interceptors.
    pub fn from_environment(
        environment: &Environment,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        Self::from_config(ClientConfig::from_environment(environment), session_store)
    }

    /// Like [`HttpClient::from_environment`], with file and environment settings applied
    pub fn from_settings(
        settings: &Settings,
        environment: &Environment,
        session_store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        Self::from_config(settings.client_config(environment), session_store)
    }

    /// Build the client from an already resolved configuration
    pub fn from_config(config: ClientConfig, session_store: Arc<dyn SessionStore>) -> Result<Self> {
        let transport: Arc<dyn Transport> = if config.embedded {
            Arc::new(EmbeddedTransport::new(ReqwestFetch::new(config.timeout)?))
        } else {
            Arc::new(DefaultTransport::new(config.timeout)?)
        };

        standard_builder(config, session_store)
            .transport(transport)
            .build()
    }

    /// Resolved configuration
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Prefix for every relative request path
    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// Whether the client talks through the desktop shell
    pub fn is_embedded(&self) -> bool {
        self.inner.config.embedded
    }

    /// Send a request through the interceptors and the transport
    ///
    /// Resolves only for statuses accepted by the success predicate. Every
    /// failure, including those raised by request interceptors, passes
    /// through the response interceptors before it is returned.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn request(&self, request: RequestConfig) -> Result<Response> {
        let outcome = self.execute(request).await;
        run_response_pipeline(&self.inner.response_interceptors, outcome).await
    }

    async fn execute(&self, request: RequestConfig) -> Result<Response> {
        let inner = &self.inner;
        let request = run_request_pipeline(&inner.request_interceptors, request).await?;

        let response = tokio::time::timeout(
            inner.config.timeout,
            inner.transport.dispatch(&inner.config.base_url, request),
        )
        .await
        .map_err(|_| HttpError::Timeout)??;

        response.into_result(inner.validate_status)
    }

    // === Request builder methods ===

    /// GET request builder
    pub fn get(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::GET, url)
    }

    /// POST request builder
    pub fn post(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::POST, url)
    }

    /// PUT request builder
    pub fn put(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::PUT, url)
    }

    /// PATCH request builder
    pub fn patch(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::PATCH, url)
    }

    /// DELETE request builder
    pub fn delete(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::DELETE, url)
    }

    /// HEAD request builder
    pub fn head(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::HEAD, url)
    }

    /// OPTIONS request builder
    pub fn options(&self, url: &str) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Method::OPTIONS, url)
    }

    // === Simple convenience methods ===

    /// GET request, returns JSON deserialized to R
    pub async fn fetch<R>(&self, url: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.get(url).send_json().await
    }

    /// POST with JSON body, returns JSON deserialized to R
    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.post(url).json(body).send_json().await
    }

    /// PUT with JSON body, returns JSON deserialized to R
    pub async fn put_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.put(url).json(body).send_json().await
    }

    /// PATCH with JSON body, returns JSON deserialized to R
    pub async fn patch_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.patch(url).json(body).send_json().await
    }

    /// DELETE request, returns JSON deserialized to R
    pub async fn delete_json<R>(&self, url: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.delete(url).send_json().await
    }
}

/// HTTP client builder
///
/// Interceptors run in the order they are added.
#[derive(Debug)]
pub struct HttpClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
    validate_status: fn(u16) -> bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig::default(),
            transport: None,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
            validate_status: is_success_status,
        }
    }
}

impl HttpClientBuilder {
    /// Replace the whole configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Use a specific transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach bearer tokens from `store` at this point of the request pipeline
    pub fn session_store(self, store: Arc<dyn SessionStore>) -> Self {
        self.request_interceptor(BearerAuth::new(store))
    }

    /// Append a request interceptor
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.request_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Append a response interceptor
    pub fn response_interceptor(mut self, interceptor: impl ResponseInterceptor + 'static) -> Self {
        self.response_interceptors.push(Arc::new(interceptor));
        self
    }

    /// Replace the success predicate
    pub fn validate_status(mut self, validate_status: fn(u16) -> bool) -> Self {
        self.validate_status = validate_status;
        self
    }

    /// Build the HTTP client
    pub fn build(self) -> Result<HttpClient> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(DefaultTransport::new(self.config.timeout)?),
        };

        Ok(HttpClient {
            inner: Arc::new(Inner {
                config: self.config,
                transport,
                request_interceptors: self.request_interceptors,
                response_interceptors: self.response_interceptors,
                validate_status: self.validate_status,
            }),
        })
    }
}

/// Builder with the standard interceptors for `config`, transport left open
///
/// Request order: prefix rewrite (embedded only), bearer token, default
/// content type. Failures are logged by [`ErrorLogger`].
pub(crate) fn standard_builder(
    config: ClientConfig,
    session_store: Arc<dyn SessionStore>,
) -> HttpClientBuilder {
    let mut builder = HttpClient::builder();
    if config.embedded {
        if let Some(rule) = config.prefix_rule.clone() {
            builder = builder.request_interceptor(PrefixRewrite::new(rule));
        }
    }

    builder
        .config(config)
        .session_store(session_store)
        .request_interceptor(DefaultContentType)
        .response_interceptor(ErrorLogger)
}

/// Install the process-wide client
///
/// Fails if a client was already installed.
pub fn install_shared(client: HttpClient) -> Result<&'static HttpClient> {
    SHARED
        .set(client)
        .map_err(|_| HttpError::Other("Shared client already installed".to_string()))?;
    SHARED
        .get()
        .ok_or_else(|| HttpError::Other("Shared client missing after install".to_string()))
}

/// The process-wide client, if installed
pub fn shared() -> Option<&'static HttpClient> {
    SHARED.get()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reqwest::header::HeaderMap;

    use super::*;
    use crate::response::ResponseBody;
    use crate::session::{MemorySessionStore, NoSession};

    /// Answers every request with a fixed status and records what it saw
    #[derive(Debug)]
    struct StubTransport {
        status: u16,
        delay: Option<Duration>,
        seen: Mutex<Vec<(String, RequestConfig)>>,
    }

    impl StubTransport {
        fn new(status: u16) -> Self {
            Self {
                status,
                delay: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn last(&self) -> (String, RequestConfig) {
            self.seen
                .lock()
                .expect("lock")
                .last()
                .cloned()
                .expect("a request was dispatched")
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn dispatch(&self, base_url: &str, request: RequestConfig) -> Result<Response> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.seen
                .lock()
                .expect("lock")
                .push((base_url.to_string(), request.clone()));
            Ok(Response::new(
                self.status,
                "",
                HeaderMap::new(),
                ResponseBody::Text(format!("status {}", self.status)),
                request,
            ))
        }
    }

    fn client_with(
        transport: Arc<StubTransport>,
        config: ClientConfig,
        store: Arc<dyn SessionStore>,
    ) -> HttpClient {
        standard_builder(config, store)
            .transport(transport)
            .build()
            .expect("client builds")
    }

    #[test]
    fn test_builder_build() {
        let result = HttpClientBuilder::default().build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_builder_sets_base_url_and_timeout() {
        let client = HttpClient::builder()
            .base_url("http://localhost:8080")
            .timeout(Duration::from_secs(3))
            .build()
            .expect("client builds");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.config().timeout, Duration::from_secs(3));
        assert!(!client.is_embedded());
    }

    #[test]
    fn test_from_environment_browser() {
        let env = Environment {
            web_base_url: Some("https://api.example.com".to_string()),
            ..Environment::default()
        };
        let client = HttpClient::from_environment(&env, Arc::new(NoSession)).expect("builds");
        assert_eq!(client.base_url(), "https://api.example.com");
        assert_eq!(client.config().timeout, Duration::from_millis(20_000));
        assert!(!client.is_embedded());
    }

    #[test]
    fn test_from_environment_embedded_fallback() {
        let env = Environment {
            embedded: true,
            ..Environment::default()
        };
        let client = HttpClient::from_environment(&env, Arc::new(NoSession)).expect("builds");
        assert_eq!(client.base_url(), "http://127.0.0.1:3002");
        assert!(client.is_embedded());
    }

    #[tokio::test]
    async fn test_success_passes_response_unchanged() {
        let transport = Arc::new(StubTransport::new(201));
        let client = client_with(
            transport.clone(),
            ClientConfig {
                base_url: "http://api".to_string(),
                ..ClientConfig::default()
            },
            Arc::new(NoSession),
        );

        let response = client.get("/items").send().await.expect("succeeds");
        assert_eq!(response.status(), 201);
        assert_eq!(response.body(), &ResponseBody::Text("status 201".to_string()));

        let (base_url, request) = transport.last();
        assert_eq!(base_url, "http://api");
        assert_eq!(request.url, "/items");
    }

    #[tokio::test]
    async fn test_failure_status_rejects_with_response() {
        for status in [199u16, 300, 404, 500] {
            let client = client_with(
                Arc::new(StubTransport::new(status)),
                ClientConfig::default(),
                Arc::new(NoSession),
            );
            let err = client.get("/x").send().await.expect_err("rejected");
            assert_eq!(err.status(), Some(status));
            assert_eq!(
                err.body(),
                Some(&ResponseBody::Text(format!("status {}", status)))
            );
        }
    }

    #[tokio::test]
    async fn test_custom_validate_status() {
        let client = HttpClient::builder()
            .transport(Arc::new(StubTransport::new(404)))
            .validate_status(|status| status < 500)
            .build()
            .expect("client builds");
        let response = client.get("/x").send().await.expect("accepted");
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_token_and_content_type_scenario() {
        let transport = Arc::new(StubTransport::new(200));
        let client = client_with(
            transport.clone(),
            ClientConfig::default(),
            Arc::new(MemorySessionStore::new(Some("abc123".to_string()))),
        );

        client.post("/orders").send().await.expect("succeeds");
        let (_, request) = transport.last();
        assert_eq!(request.header("Authorization"), Some("Bearer abc123"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));

        client.get("/orders").send().await.expect("succeeds");
        let (_, request) = transport.last();
        assert_eq!(request.header("Authorization"), Some("Bearer abc123"));
        assert_eq!(request.header("Content-Type"), None);
    }

    #[tokio::test]
    async fn test_prefix_rewrite_only_when_embedded() {
        let transport = Arc::new(StubTransport::new(200));
        let embedded = ClientConfig {
            base_url: "http://127.0.0.1:3002".to_string(),
            embedded: true,
            prefix_rule: Some(Default::default()),
            ..ClientConfig::default()
        };
        let client = client_with(transport.clone(), embedded.clone(), Arc::new(NoSession));
        client.get("/api/users").send().await.expect("succeeds");
        assert_eq!(transport.last().1.url, "/users");

        let browser = ClientConfig {
            embedded: false,
            ..embedded
        };
        let client = client_with(transport.clone(), browser, Arc::new(NoSession));
        client.get("/api/users").send().await.expect("succeeds");
        assert_eq!(transport.last().1.url, "/api/users");
    }

    #[tokio::test]
    async fn test_timeout() {
        let transport = Arc::new(StubTransport {
            delay: Some(Duration::from_secs(5)),
            ..StubTransport::new(200)
        });
        let client = client_with(
            transport,
            ClientConfig {
                timeout: Duration::from_millis(20),
                ..ClientConfig::default()
            },
            Arc::new(NoSession),
        );
        let err = client.get("/slow").send().await.expect_err("times out");
        assert!(matches!(err, HttpError::Timeout));
    }

    #[tokio::test]
    async fn test_fetch_deserializes_text_json() {
        #[derive(serde::Deserialize)]
        struct Status {
            ok: bool,
        }

        #[derive(Debug)]
        struct JsonTransport;

        #[async_trait]
        impl Transport for JsonTransport {
            async fn dispatch(&self, _base_url: &str, request: RequestConfig) -> Result<Response> {
                Ok(Response::new(
                    200,
                    "OK",
                    HeaderMap::new(),
                    ResponseBody::Json(serde_json::json!({"ok": true})),
                    request,
                ))
            }
        }

        let client = HttpClient::builder()
            .transport(Arc::new(JsonTransport))
            .build()
            .expect("client builds");
        let status: Status = client.fetch("/status").await.expect("parses");
        assert!(status.ok);
    }

    #[test]
    fn test_shared_client_installs_once() {
        let client = HttpClient::builder().build().expect("client builds");
        let installed = install_shared(client.clone()).expect("first install");
        assert_eq!(installed.base_url(), client.base_url());
        assert!(shared().is_some());

        let second = install_shared(client);
        assert!(matches!(second, Err(HttpError::Other(_))));
    }
}
