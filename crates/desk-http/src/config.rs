//! Client configuration
//!
//! The base URL is resolved once from the detected [`Environment`] and the
//! settings below, then injected into the client. Settings are layered:
//! built-in defaults, an optional TOML file, then environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};

use crate::environment::{
    non_empty, parse_flag, Environment, ENV_EMBEDDED, ENV_EMBEDDED_BASE_URL, ENV_WEB_BASE_URL,
};

/// Base URL used outside the desktop shell when none is configured
pub const DEFAULT_WEB_BASE_URL: &str = "/api";
/// Address substituted when the desktop shell would end up with a non-absolute base URL
pub const EMBEDDED_FALLBACK_BASE_URL: &str = "http://127.0.0.1:3002";
/// Request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

/// Timeout override
pub const ENV_TIMEOUT_MS: &str = "DESK_HTTP_TIMEOUT_MS";

/// Whether `url` is an absolute http(s) URL
pub fn is_absolute_url(url: &str) -> bool {
    url::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Pick the base URL for the current platform
///
/// Inside the desktop shell a non-absolute base URL cannot be served, so it is
/// replaced by [`EMBEDDED_FALLBACK_BASE_URL`].
pub fn resolve_base_url(
    embedded: bool,
    embedded_base_url: Option<&str>,
    web_base_url: Option<&str>,
) -> String {
    let base_url = if embedded {
        embedded_base_url
            .or(web_base_url)
            .unwrap_or(DEFAULT_WEB_BASE_URL)
    } else {
        web_base_url.unwrap_or(DEFAULT_WEB_BASE_URL)
    };

    if embedded && !is_absolute_url(base_url) {
        tracing::error!(
            "Non-absolute base URL '{}' cannot be used inside the desktop shell, using {}",
            base_url,
            EMBEDDED_FALLBACK_BASE_URL
        );
        return EMBEDDED_FALLBACK_BASE_URL.to_string();
    }

    base_url.to_string()
}

/// Literal path prefix rewrite applied to request URLs inside the desktop shell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRule {
    /// Prefix to look for
    pub from: String,
    /// Replacement
    pub to: String,
}

impl Default for PrefixRule {
    fn default() -> Self {
        Self {
            from: "/api/".to_string(),
            to: "/".to_string(),
        }
    }
}

impl PrefixRule {
    /// Rewritten URL, or `None` when the prefix does not match
    pub fn apply(&self, url: &str) -> Option<String> {
        if self.from.is_empty() {
            return None;
        }
        url.strip_prefix(&self.from)
            .map(|rest| format!("{}{}", self.to, rest))
    }
}

/// Resolved configuration handed to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for every relative request path
    pub base_url: String,
    /// Timeout for a whole request
    pub timeout: Duration,
    /// Running inside the desktop shell
    pub embedded: bool,
    /// Rewrite applied to request paths, only used when embedded
    pub prefix_rule: Option<PrefixRule>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEB_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            embedded: false,
            prefix_rule: None,
        }
    }
}

impl ClientConfig {
    /// Resolve the configuration from the detected environment alone
    pub fn from_environment(environment: &Environment) -> Self {
        Settings::default().client_config(environment)
    }
}

/// Client section of the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Force embedded detection on or off
    pub embedded: Option<bool>,
    /// Base URL used inside the desktop shell
    pub embedded_base_url: Option<String>,
    /// Base URL of the web API
    pub web_base_url: Option<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// Apply `prefix_rule` to request paths inside the desktop shell
    pub rewrite_prefix: bool,
    /// Legacy prefix rewrite
    pub prefix_rule: PrefixRule,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            embedded: None,
            embedded_base_url: None,
            web_base_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            rewrite_prefix: true,
            prefix_rule: PrefixRule::default(),
        }
    }
}

/// Settings loaded from defaults, file and environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// HTTP client settings
    pub client: ClientSettings,
}

impl Settings {
    /// Load settings from an optional TOML file
    ///
    /// A missing or malformed file is logged and the defaults are used.
    pub fn new<P>(config_file_name: Option<P>) -> Self
    where
        P: Into<PathBuf>,
    {
        let default_settings = Self::default();
        let Some(config_file_name) = config_file_name else {
            return default_settings;
        };

        match Self::new_from_default(&default_settings, config_file_name) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!(
                    "Error reading config file, falling back to defaults. Error: {e:?}"
                );
                default_settings
            }
        }
    }

    fn new_from_default<P>(default: &Settings, config_file_name: P) -> Result<Self, ConfigError>
    where
        P: Into<PathBuf>,
    {
        let path: PathBuf = config_file_name.into();
        let config = Config::builder()
            .add_source(Config::try_from(default)?)
            .add_source(File::from(path))
            .build()?;

        config.try_deserialize()
    }

    /// Override settings with process environment variables
    pub fn from_env(self) -> Self {
        self.from_lookup(|key| env::var(key).ok())
    }

    /// Override settings with an arbitrary variable lookup
    pub fn from_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup(ENV_EMBEDDED) {
            match parse_flag(&flag) {
                Some(embedded) => self.client.embedded = Some(embedded),
                None => tracing::warn!(
                    "Invalid value '{}' for {}, expected true or false",
                    flag,
                    ENV_EMBEDDED
                ),
            }
        }

        if let Some(url) = non_empty(lookup(ENV_EMBEDDED_BASE_URL)) {
            self.client.embedded_base_url = Some(url);
        }

        if let Some(url) = non_empty(lookup(ENV_WEB_BASE_URL)) {
            self.client.web_base_url = Some(url);
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            match timeout.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.client.timeout_ms = ms,
                _ => tracing::warn!(
                    "Invalid value '{}' for {}, keeping {} ms",
                    timeout,
                    ENV_TIMEOUT_MS,
                    self.client.timeout_ms
                ),
            }
        }

        self
    }

    /// Resolve the client configuration
    ///
    /// Values from the settings win over the detected environment.
    pub fn client_config(&self, environment: &Environment) -> ClientConfig {
        let client = &self.client;
        let embedded = client.embedded.unwrap_or(environment.embedded);

        let embedded_base_url = non_empty(client.embedded_base_url.clone())
            .or_else(|| environment.embedded_base_url.clone());
        let web_base_url =
            non_empty(client.web_base_url.clone()).or_else(|| environment.web_base_url.clone());

        let base_url = resolve_base_url(
            embedded,
            embedded_base_url.as_deref(),
            web_base_url.as_deref(),
        );
        tracing::info!("Resolved base URL: {}", base_url);

        let timeout_ms = if client.timeout_ms == 0 {
            tracing::warn!(
                "A timeout of 0 ms would fail every request, using {} ms",
                DEFAULT_TIMEOUT_MS
            );
            DEFAULT_TIMEOUT_MS
        } else {
            client.timeout_ms
        };

        ClientConfig {
            base_url,
            timeout: Duration::from_millis(timeout_ms),
            embedded,
            prefix_rule: client.rewrite_prefix.then(|| client.prefix_rule.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_browser_uses_web_url() {
        assert_eq!(
            resolve_base_url(false, Some("http://desk:1"), Some("https://api.example.com")),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_browser_defaults_to_relative_api() {
        assert_eq!(resolve_base_url(false, Some("http://desk:1"), None), "/api");
        assert_eq!(resolve_base_url(false, None, None), "/api");
    }

    #[test]
    fn test_embedded_prefers_embedded_url() {
        assert_eq!(
            resolve_base_url(true, Some("http://10.0.0.2:8080"), Some("https://api.example.com")),
            "http://10.0.0.2:8080"
        );
        assert_eq!(
            resolve_base_url(true, None, Some("https://api.example.com")),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_embedded_without_urls_uses_fallback() {
        assert_eq!(resolve_base_url(true, None, None), "http://127.0.0.1:3002");
    }

    #[test]
    fn test_embedded_relative_url_uses_fallback() {
        for relative in ["/api", "/", "api/v1"] {
            let resolved = resolve_base_url(true, Some(relative), None);
            assert_eq!(resolved, EMBEDDED_FALLBACK_BASE_URL);
            assert!(!resolved.starts_with('/'));
        }
        assert_eq!(
            resolve_base_url(true, None, Some("/backend")),
            EMBEDDED_FALLBACK_BASE_URL
        );
    }

    #[test]
    fn test_embedded_custom_scheme_falls_back_with_accurate_log() {
        use std::sync::Arc;

        use tracing_subscriber::filter::LevelFilter;
        use tracing_subscriber::layer::SubscriberExt;

        use crate::log_buffer::{LogBuffer, LogBufferLayer};

        let buffer = Arc::new(LogBuffer::new(10, LevelFilter::ERROR));
        let subscriber = tracing_subscriber::registry().with(LogBufferLayer::new(buffer.clone()));

        let resolved = tracing::subscriber::with_default(subscriber, || {
            resolve_base_url(true, Some("tauri://localhost"), None)
        });
        assert_eq!(resolved, EMBEDDED_FALLBACK_BASE_URL);

        let (entries, _) = buffer.since(None, None);
        assert_eq!(entries.len(), 1);
        assert!(entries[0]
            .message
            .starts_with("Non-absolute base URL 'tauri://localhost'"));
    }

    #[test]
    fn test_prefix_rule() {
        let rule = PrefixRule::default();
        assert_eq!(rule.apply("/api/users"), Some("/users".to_string()));
        assert_eq!(rule.apply("/apiary"), None);
        assert_eq!(rule.apply("/users"), None);

        let disabled = PrefixRule {
            from: String::new(),
            to: "/".to_string(),
        };
        assert_eq!(disabled.apply("/api/users"), None);
    }

    #[test]
    fn test_default_settings_resolve_like_environment() {
        let env = Environment::default();
        let config = Settings::default().client_config(&env);
        assert_eq!(config, ClientConfig::from_environment(&env));
        assert_eq!(config.base_url, "/api");
        assert_eq!(config.timeout, Duration::from_millis(20_000));
        assert!(!config.embedded);
    }

    #[test]
    fn test_prefix_rule_only_when_enabled() {
        let mut settings = Settings::default();
        let config = settings.client_config(&Environment::default());
        assert_eq!(config.prefix_rule, Some(PrefixRule::default()));

        settings.client.rewrite_prefix = false;
        let config = settings.client_config(&Environment::default());
        assert_eq!(config.prefix_rule, None);
    }

    #[test]
    fn test_env_overrides_settings() {
        let settings = Settings::default().from_lookup(lookup_of(&[
            (ENV_EMBEDDED, "true"),
            (ENV_WEB_BASE_URL, "https://web.example.com"),
            (ENV_TIMEOUT_MS, "1500"),
        ]));
        assert_eq!(settings.client.embedded, Some(true));
        assert_eq!(settings.client.timeout_ms, 1500);

        let config = settings.client_config(&Environment::default());
        assert!(config.embedded);
        assert_eq!(config.base_url, "https://web.example.com");
        assert_eq!(config.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let settings = Settings::default().from_lookup(lookup_of(&[
            (ENV_EMBEDDED, "perhaps"),
            (ENV_TIMEOUT_MS, "soon"),
        ]));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let settings = Settings::default().from_lookup(lookup_of(&[(ENV_TIMEOUT_MS, "0")]));
        assert_eq!(settings.client.timeout_ms, DEFAULT_TIMEOUT_MS);

        let mut settings = Settings::default();
        settings.client.timeout_ms = 0;
        let config = settings.client_config(&Environment::default());
        assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn test_settings_from_toml_file() {
        let dir = std::env::temp_dir().join(format!("desk-http-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("config.toml");
        let mut file = std::fs::File::create(&path).expect("create file");
        writeln!(
            file,
            r#"
[client]
embedded_base_url = "http://192.168.1.20:3002"
timeout_ms = 5000

[client.prefix_rule]
from = "/legacy/"
to = "/v2/"
"#
        )
        .expect("write file");

        let settings = Settings::new(Some(&path));
        assert_eq!(
            settings.client.embedded_base_url.as_deref(),
            Some("http://192.168.1.20:3002")
        );
        assert_eq!(settings.client.timeout_ms, 5000);
        assert_eq!(settings.client.prefix_rule.from, "/legacy/");
        assert!(settings.client.rewrite_prefix);

        let env = Environment {
            embedded: true,
            ..Environment::default()
        };
        let config = settings.client_config(&env);
        assert_eq!(config.base_url, "http://192.168.1.20:3002");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let settings = Settings::new(Some("/definitely/not/here/desk-http.toml"));
        assert_eq!(settings, Settings::default());
    }
}
