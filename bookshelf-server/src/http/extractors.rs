//! Custom Axum extractors
//!
//! Both reject with [`ApiError`], so malformed requests get the same JSON
//! `{"message": ...}` body as every other error.

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::Form;
use bookshelf_core::BookFields;

use super::error::ApiError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Book id from the path.
///
/// Anything that is not an `i64` cannot name a book, so it is a 404.
pub struct BookId(pub i64);

impl<S> FromRequestParts<S> for BookId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;

        raw.parse().map(Self).map_err(|_| ApiError::NotFound)
    }
}

/// Form-encoded book fields.
///
/// A missing or empty body, with or without a content type, is a form with
/// no fields.
pub struct BookForm(pub BookFields);

impl<S> FromRequest<S> for BookForm
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE));

        if is_form {
            let Form(fields) = Form::<BookFields>::from_request(req, state)
                .await
                .map_err(|e| ApiError::InvalidBody {
                    reason: e.body_text(),
                })?;
            return Ok(Self(fields));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::InvalidBody {
                reason: e.body_text(),
            })?;
        if body.is_empty() {
            Ok(Self(BookFields::default()))
        } else {
            Err(ApiError::InvalidBody {
                reason: format!("Expected a {FORM_CONTENT_TYPE} body"),
            })
        }
    }
}
