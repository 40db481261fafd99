/// Structured error types for bookshelf storage backends.
///
/// Every backend reports failures through [`StoreError`]; the HTTP layer
/// maps each variant to a status code.
use thiserror::Error;

/// Error returned by [`crate::BookStore`] operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A required form field was absent on create
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// No record with this id exists
    #[error("Book {0} not found")]
    NotFound(i64),

    /// The backend could not be reached or failed mid-operation
    #[error("Backend unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create a backend-unavailable error
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// True for failures of the backend itself rather than of the request
    pub fn is_backend_failure(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
