use thiserror::Error;

use crate::transaction::{TransactionError, TransactionId};

/// Entity name used in repository errors about transactions.
pub const TRANSACTION_ENTITY: &str = "Transaction";

/// Errors that can occur when constructing a date range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("Invalid date range: start date must be before or equal to end date")]
    InvalidRange,
    #[error("Invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("Invalid month format (expected YYYY-MM): {0}")]
    InvalidMonthFormat(String),
}

/// Errors that can occur when parsing a page cursor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("Invalid page cursor: {0}")]
    Malformed(String),
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    pub fn transaction_not_found(id: &TransactionId) -> Self {
        Self::NotFound {
            entity_type: TRANSACTION_ENTITY,
            id: id.to_string(),
        }
    }

    pub fn transaction_exists(id: &TransactionId) -> Self {
        Self::AlreadyExists {
            entity_type: TRANSACTION_ENTITY,
            id: id.to_string(),
        }
    }

    /// True for errors caused by the store being unreachable.
    pub fn is_connection(&self) -> bool {
        matches!(self, RepositoryError::ConnectionFailed(_))
    }
}

impl From<TransactionError> for RepositoryError {
    fn from(error: TransactionError) -> Self {
        RepositoryError::InvalidData(error.to_string())
    }
}

impl From<CursorError> for RepositoryError {
    fn from(error: CursorError) -> Self {
        RepositoryError::InvalidData(error.to_string())
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_range_error_display() {
        assert_eq!(
            DateRangeError::InvalidRange.to_string(),
            "Invalid date range: start date must be before or equal to end date"
        );
    }

    #[test]
    fn test_cursor_error_display() {
        assert_eq!(
            CursorError::Malformed("nope".to_string()).to_string(),
            "Invalid page cursor: nope"
        );
    }

    #[test]
    fn test_transaction_not_found_display() {
        let error = RepositoryError::transaction_not_found(&"abc-123".into());
        assert_eq!(error.to_string(), "Transaction not found: abc-123");
    }

    #[test]
    fn test_transaction_exists_display() {
        let error = RepositoryError::transaction_exists(&"local-4".into());
        assert_eq!(error.to_string(), "Transaction already exists: local-4");
    }

    #[test]
    fn test_connection_failed_display() {
        let error = RepositoryError::ConnectionFailed("timeout after 30s".to_string());
        assert_eq!(error.to_string(), "Connection failed: timeout after 30s");
        assert!(error.is_connection());
    }

    #[test]
    fn test_query_failed_display() {
        let error = RepositoryError::QueryFailed("no such table".to_string());
        assert_eq!(error.to_string(), "Query failed: no such table");
        assert!(!error.is_connection());
    }

    #[test]
    fn test_serialization_display() {
        let error = RepositoryError::Serialization("missing field `date`".to_string());
        assert_eq!(
            error.to_string(),
            "Serialization error: missing field `date`"
        );
    }

    #[test]
    fn test_validation_error_becomes_invalid_data() {
        let error: RepositoryError = TransactionError::MissingId.into();
        assert_eq!(error.to_string(), "Invalid data: Transaction ID is required");
    }
}
