//! API error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use smartupd_core::CoreError;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
}

impl ApiError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Wrapper for API errors with status codes
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: ApiError,
}

impl AppError {
    fn with(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            error: ApiError::new(code, message),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::with(StatusCode::BAD_GATEWAY, "HOST_ERROR", message)
    }
}

impl From<CoreError> for AppError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Host(_) => Self::bad_gateway(e.to_string()),
            CoreError::InvalidEntityId(_) | CoreError::InvalidTime(_) => {
                Self::bad_request(e.to_string())
            }
            // Updater stopped between lookup and reply
            CoreError::ActorError(_) => Self::unavailable(e.to_string()),
            CoreError::Storage(_) => Self::internal(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use smartupd_hass::HassError;

    use super::*;

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (CoreError::Host(HassError::Timeout), StatusCode::BAD_GATEWAY),
            (
                CoreError::InvalidEntityId("x".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::InvalidTime("25:00".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CoreError::Storage("disk full".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CoreError::ActorError("stopped".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(AppError::from(error).status, status);
        }
    }
}
