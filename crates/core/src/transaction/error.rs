use thiserror::Error;

/// Errors that can occur when validating a transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction ID is required")]
    MissingId,
    #[error("Transaction description too long (max {max} characters)")]
    DescriptionTooLong { max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_error_display() {
        assert_eq!(
            TransactionError::MissingId.to_string(),
            "Transaction ID is required"
        );
        assert_eq!(
            TransactionError::DescriptionTooLong { max: 500 }.to_string(),
            "Transaction description too long (max 500 characters)"
        );
    }
}
