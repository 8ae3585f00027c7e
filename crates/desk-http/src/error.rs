//! HTTP error types

use thiserror::Error;

use crate::response::{Response, ResponseBody};

/// Errors surfaced by the client
///
/// Every failure reaches the caller as the same value that was produced at
/// its origin. Response interceptors may log it but never rewrite it.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Response received with a status outside the success range
    #[error("HTTP error ({}) for {}", .0.status(), .0.config().url)]
    Status(Box<Response>),
    /// No response received
    #[error("Connection error: {0}")]
    Connection(String),
    /// Request timeout
    #[error("Request timeout")]
    Timeout,
    /// Failure raised by a request interceptor
    #[error("Interceptor error: {0}")]
    Interceptor(String),
    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Header name or value rejected
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// Client build error
    #[error("Client build error: {0}")]
    Build(String),
    /// Other error
    #[error("{0}")]
    Other(String),
}

impl HttpError {
    /// Status code of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        self.response().map(Response::status)
    }

    /// The failed response, if one was received
    pub fn response(&self) -> Option<&Response> {
        match self {
            HttpError::Status(response) => Some(response),
            _ => None,
        }
    }

    /// Body of the failed response, if one was received
    pub fn body(&self) -> Option<&ResponseBody> {
        self.response().map(Response::body)
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout
        } else if err.is_builder() {
            HttpError::Build(err.to_string())
        } else if err.is_connect() || err.is_request() {
            HttpError::Connection(err.to_string())
        } else if err.is_decode() || err.is_body() {
            HttpError::Serialization(err.to_string())
        } else {
            HttpError::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::Serialization(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for HttpError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        HttpError::InvalidHeader(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderName> for HttpError {
    fn from(err: reqwest::header::InvalidHeaderName) -> Self {
        HttpError::InvalidHeader(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderMap;
    use reqwest::Method;

    use super::*;
    use crate::request::RequestConfig;

    fn failed(status: u16, body: ResponseBody) -> HttpError {
        let config = RequestConfig::new(Method::GET, "/users/7");
        HttpError::Status(Box::new(Response::new(
            status,
            "Not Found",
            HeaderMap::new(),
            body,
            config,
        )))
    }

    #[test]
    fn test_http_error_status_display() {
        let error = failed(404, ResponseBody::Empty);
        assert_eq!(format!("{}", error), "HTTP error (404) for /users/7");
    }

    #[test]
    fn test_http_error_status_exposes_status_and_body() {
        let error = failed(404, ResponseBody::Text("missing".to_string()));
        assert_eq!(error.status(), Some(404));
        assert_eq!(
            error.body(),
            Some(&ResponseBody::Text("missing".to_string()))
        );
    }

    #[test]
    fn test_http_error_without_response() {
        let error = HttpError::Connection("connection refused".to_string());
        assert_eq!(error.status(), None);
        assert!(error.body().is_none());
        assert_eq!(format!("{}", error), "Connection error: connection refused");
    }

    #[test]
    fn test_http_error_timeout_display() {
        assert_eq!(format!("{}", HttpError::Timeout), "Request timeout");
    }

    #[test]
    fn test_http_error_interceptor_display() {
        let error = HttpError::Interceptor("session store unavailable".to_string());
        assert_eq!(
            format!("{}", error),
            "Interceptor error: session store unavailable"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let result: Result<String, _> = serde_json::from_str("not valid json");
        let json_error = result.expect_err("Invalid JSON should produce an error");
        let http_error: HttpError = json_error.into();

        match http_error {
            HttpError::Serialization(msg) => {
                assert!(
                    msg.contains("expected"),
                    "Error message should describe JSON error"
                );
            }
            _ => panic!("Expected HttpError::Serialization"),
        }
    }
}
