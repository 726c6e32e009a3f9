//! Storage error types.

use automation_crypto::CryptoError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("invalid workspace: {0}")]
    InvalidWorkspace(String),

    #[error("workspace scan failed: {0}")]
    Walk(#[from] walkdir::Error),
}
