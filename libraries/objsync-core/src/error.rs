/// Core error types for objsync
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using `SyncError`
pub type Result<T> = std::result::Result<T, SyncError>;

/// Core error type for objsync
#[derive(Error, Debug)]
pub enum SyncError {
    /// Credentials or a token could not be resolved, or were rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Container or object absent (often a signal rather than a failure)
    #[error("{entity} not found: {name}")]
    NotFound { entity: String, name: String },

    /// Timeout, connection failure or 5xx response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Unexpected destination state (409 and other rejected requests)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Failed to enumerate an account or a container
    #[error("Failed to list {target}: {source}")]
    Listing {
        target: String,
        #[source]
        source: Box<SyncError>,
    },

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sync state store errors
    #[error("State store error: {0}")]
    State(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A worker task ended without producing an outcome (panic or abort)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            name: name.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Wrap an error raised while enumerating `target`
    pub fn listing(target: impl Into<String>, source: SyncError) -> Self {
        Self::Listing {
            target: target.into(),
            source: Box::new(source),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error means the addressed item does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Classification carried into outcome reports
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Listing { .. } => ErrorKind::Listing,
            Self::Config(_) | Self::InvalidInput(_) => ErrorKind::Config,
            Self::State(_) => ErrorKind::State,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(format!("malformed response body: {err}"))
    }
}

/// Error classification, serialisable into reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Auth,
    NotFound,
    Transport,
    Conflict,
    Listing,
    Config,
    State,
    Internal,
}
