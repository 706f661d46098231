use thiserror::Error;

/// Errors that make a legacy record impossible to normalize.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Record is not a JSON object")]
    NotAnObject,
    #[error("Record has no date")]
    MissingDate,
    #[error("Unrecognized date: {0}")]
    InvalidDate(String),
    #[error("Unrecognized amount: {0}")]
    InvalidAmount(String),
    #[error("Input is not a JSON array")]
    NotAnArray,
}

/// Result type for normalization.
pub type Result<T> = std::result::Result<T, NormalizeError>;
