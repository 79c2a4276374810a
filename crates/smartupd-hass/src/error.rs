//! Error types for smartupd-hass

use thiserror::Error;

/// Errors that can occur while talking to the host platform
#[derive(Error, Debug, Clone)]
pub enum HassError {
    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// WebSocket transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Access token rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Host answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Body returned by the host
        message: String,
    },

    /// Service call failed on the host side
    #[error("service {domain}.{service} failed: {message}")]
    ServiceFailed {
        /// Service domain
        domain: String,
        /// Service name
        service: String,
        /// Failure reason
        message: String,
    },

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Payload could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid host URL
    #[error("invalid URL: {0}")]
    Url(String),

    /// Response did not follow the expected protocol
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for HassError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HassError::Timeout
        } else {
            HassError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for HassError {
    fn from(e: serde_json::Error) -> Self {
        HassError::Json(e.to_string())
    }
}

impl From<url::ParseError> for HassError {
    fn from(e: url::ParseError) -> Self {
        HassError::Url(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for HassError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        HassError::WebSocket(e.to_string())
    }
}
