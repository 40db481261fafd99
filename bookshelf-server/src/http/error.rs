//! API error types with IntoResponse
//!
//! Errors are converted to JSON `{"message": ...}` bodies with appropriate
//! status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bookshelf_core::StoreError;
use serde_json::json;

/// API error type with automatic HTTP status mapping
#[derive(Debug)]
pub enum ApiError {
    /// Required form field missing (400)
    MissingField { field: &'static str },

    /// No book with the requested id (404)
    NotFound,

    /// Body present but not a form (400)
    InvalidBody { reason: String },

    /// Storage backend failed (500, logged where it happened)
    Backend,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingField { field } => (
                StatusCode::BAD_REQUEST,
                format!("Missing required field: {}", field),
            ),
            Self::NotFound => (StatusCode::NOT_FOUND, "Book not found".to_string()),
            Self::InvalidBody { reason } => (StatusCode::BAD_REQUEST, reason),
            Self::Backend => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "an internal error occurred".to_string(),
            ),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingField(field) => Self::MissingField { field },
            StoreError::NotFound(_) => Self::NotFound,
            StoreError::Unavailable { .. } => Self::Backend,
        }
    }
}
