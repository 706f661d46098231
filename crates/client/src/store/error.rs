use thiserror::Error;

use expensync_core::storage::RepositoryError;
use expensync_core::transaction::TransactionError;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors returned by [`TransactionStore`](super::TransactionStore) operations.
///
/// Local cache failures never surface here; they are logged and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_transparent() {
        let err: StoreError = TransactionError::MissingId.into();
        assert_eq!(err.to_string(), "Transaction ID is required");

        let err: StoreError = RepositoryError::ConnectionFailed("offline".to_string()).into();
        assert_eq!(err.to_string(), "Connection failed: offline");
    }
}
