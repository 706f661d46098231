//! Client error types.

use thiserror::Error;

use expensync_core::storage::RepositoryError;

/// Result type alias for client module.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("SSE parse error: {0}")]
    SseParse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for RepositoryError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Repository(err) => err,
            ClientError::Request(err) if err.is_connect() || err.is_timeout() => {
                RepositoryError::ConnectionFailed(err.to_string())
            }
            ClientError::Request(err) if err.is_decode() => {
                RepositoryError::Serialization(err.to_string())
            }
            ClientError::Json(err) => RepositoryError::Serialization(err.to_string()),
            ClientError::SseParse(msg) => RepositoryError::Serialization(msg),
            ClientError::InvalidInput(msg) => RepositoryError::InvalidData(msg),
            ClientError::Io(err) => RepositoryError::ConnectionFailed(err.to_string()),
            ClientError::Request(err) => RepositoryError::QueryFailed(err.to_string()),
        }
    }
}
