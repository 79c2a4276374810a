//! Core error types for smartupd-core

use kameo::error::SendError;
use smartupd_hass::HassError;
use thiserror::Error;

/// Errors that can occur in updater operations
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Host platform call failed (install, state read, registry read)
    #[error("host platform error: {0}")]
    Host(#[from] HassError),

    /// History could not be loaded or persisted
    #[error("storage error: {0}")]
    Storage(String),

    /// Entity id failed validation
    #[error("invalid entity id: {0}")]
    InvalidEntityId(String),

    /// Auto-update time is not `HH:MM[:SS]`
    #[error("invalid time of day: {0}")]
    InvalidTime(String),

    /// Actor communication error
    #[error("actor communication error: {0}")]
    ActorError(String),
}

impl<M> From<SendError<M, CoreError>> for CoreError {
    fn from(e: SendError<M, CoreError>) -> Self {
        match e {
            SendError::HandlerError(inner) => inner,
            other => CoreError::ActorError(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}
