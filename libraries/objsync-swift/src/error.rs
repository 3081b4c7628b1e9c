//! Error types for the Swift client.

use objsync_core::SyncError;
use thiserror::Error;

/// Errors that can occur when talking to a storage or identity endpoint.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed (connection, timeout, body transfer)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server returned an error response
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Invalid endpoint or identity URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse server response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Identity service answered but did not grant what was asked
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Credentials string is not `tenant:user:password`
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Map into the engine taxonomy, naming the item that was addressed.
    pub fn into_sync_error(self, entity: &str, name: &str) -> SyncError {
        match self {
            Self::Request(e) if e.is_timeout() => {
                SyncError::transport(format!("{entity} {name}: request timed out: {e}"))
            }
            Self::Request(e) => SyncError::transport(format!("{entity} {name}: {e}")),
            Self::ServerError { status: 401 | 403, message } => {
                SyncError::auth(format!("{entity} {name}: {message}"))
            }
            Self::ServerError { status: 404, .. } => SyncError::not_found(entity, name),
            Self::ServerError { status, message } if status >= 500 => {
                SyncError::transport(format!("{entity} {name}: {status} {message}"))
            }
            Self::ServerError { status, message } => {
                SyncError::conflict(format!("{entity} {name}: {status} {message}"))
            }
            Self::InvalidUrl(msg) => SyncError::config(msg),
            Self::ParseError(msg) => SyncError::transport(format!("{entity} {name}: {msg}")),
            Self::AuthFailed(msg) | Self::InvalidCredentials(msg) => SyncError::auth(msg),
        }
    }
}

impl From<ClientError> for SyncError {
    fn from(err: ClientError) -> Self {
        err.into_sync_error("endpoint", "-")
    }
}
