//! Runtime platform detection
//!
//! Decides whether the process runs inside a desktop embedding shell and
//! collects the base URLs configured for each platform.

use std::env;

/// Marker variables exported by the desktop shell
pub const EMBEDDED_MARKERS: [&str; 3] = ["TAURI_ENV_PLATFORM", "__TAURI__", "__TAURI_INTERNALS__"];

/// Explicit override for embedded detection
pub const ENV_EMBEDDED: &str = "DESK_HTTP_EMBEDDED";
/// Base URL used inside the desktop shell
pub const ENV_EMBEDDED_BASE_URL: &str = "DESK_HTTP_EMBEDDED_BASE_URL";
/// Base URL of the web API
pub const ENV_WEB_BASE_URL: &str = "DESK_HTTP_WEB_BASE_URL";

/// Inputs read once at startup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Running inside the desktop shell
    pub embedded: bool,
    /// Base URL configured for the desktop shell
    pub embedded_base_url: Option<String>,
    /// Base URL configured for the web API
    pub web_base_url: Option<String>,
}

impl Environment {
    /// Read the process environment
    pub fn detect() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let embedded = match lookup(ENV_EMBEDDED).and_then(|v| parse_flag(&v)) {
            Some(flag) => flag,
            None => EMBEDDED_MARKERS.iter().any(|m| lookup(m).is_some()),
        };

        Self {
            embedded,
            embedded_base_url: non_empty(lookup(ENV_EMBEDDED_BASE_URL)),
            web_base_url: non_empty(lookup(ENV_WEB_BASE_URL)),
        }
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
