//! Pure mappings between repository errors and HTTP status codes.
//!
//! The server uses [`repository_error_to_status_code`] to answer requests and
//! the HTTP client uses [`status_code_to_repository_error`] to turn those
//! answers back into the same error variants.

use super::{RepositoryError, TRANSACTION_ENTITY};

/// Maps a [`RepositoryError`] to an HTTP status code.
///
/// This is a pure function that returns the appropriate HTTP status code
/// for each error variant:
///
/// - `NotFound` -> 404 (Not Found)
/// - `AlreadyExists` -> 409 (Conflict)
/// - `ConnectionFailed` -> 503 (Service Unavailable)
/// - `QueryFailed` -> 500 (Internal Server Error)
/// - `Serialization` -> 500 (Internal Server Error)
/// - `InvalidData` -> 400 (Bad Request)
///
/// # Examples
///
/// ```
/// use expensync_core::storage::{RepositoryError, repository_error_to_status_code};
///
/// let error = RepositoryError::transaction_not_found(&"abc-123".into());
/// assert_eq!(repository_error_to_status_code(&error), 404);
/// ```
pub fn repository_error_to_status_code(error: &RepositoryError) -> u16 {
    match error {
        RepositoryError::NotFound { .. } => 404,
        RepositoryError::AlreadyExists { .. } => 409,
        RepositoryError::ConnectionFailed(_) => 503,
        RepositoryError::QueryFailed(_) => 500,
        RepositoryError::Serialization(_) => 500,
        RepositoryError::InvalidData(_) => 400,
    }
}

/// Maps an unsuccessful HTTP response back to a [`RepositoryError`].
///
/// `resource_id` names the document the request was about, if any; `message`
/// is the error text from the response body.
pub fn status_code_to_repository_error(
    status: u16,
    resource_id: Option<&str>,
    message: impl Into<String>,
) -> RepositoryError {
    let message = message.into();
    let id = resource_id.map(str::to_string).unwrap_or_else(|| message.clone());
    match status {
        404 => RepositoryError::NotFound {
            entity_type: TRANSACTION_ENTITY,
            id,
        },
        409 => RepositoryError::AlreadyExists {
            entity_type: TRANSACTION_ENTITY,
            id,
        },
        400 | 422 => RepositoryError::InvalidData(message),
        502..=504 => RepositoryError::ConnectionFailed(message),
        _ => RepositoryError::QueryFailed(format!("HTTP {status}: {message}")),
    }
}
