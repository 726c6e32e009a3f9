//! Cloud error types.

use automation_crypto::CryptoError;
use automation_storage::StorageError;
use thiserror::Error;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur talking to the automation service or reconciling.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("API request failed with status {status}: {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("a reconcile is already in progress")]
    ReconcileInProgress,

    #[error("refresher is not running")]
    RefresherStopped,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl CloudError {
    /// Whether the service reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound(_))
    }

    /// HTTP status carried by a service error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudError::Api { status, .. } => Some(*status),
            CloudError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
