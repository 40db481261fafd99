//! Book endpoints
//!
//! Form-encoded bodies, JSON responses. Create redirects back to the
//! landing page, as the form on it posts here.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Redirect;
use axum::routing::{get, put};
use axum::{Json, Router};
use bookshelf_core::{Book, Operation};
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::extractors::{BookForm, BookId};
use crate::http::server::AppState;

/// Message-only response body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// GET /books - all books, ascending id
async fn list_books(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>, ApiError> {
    let books = state
        .store
        .list_all()
        .await
        .map_err(|e| state.reject(Operation::List, e))?;
    Ok(Json(books))
}

/// POST /books - create from form, redirect home
async fn create_book(
    State(state): State<Arc<AppState>>,
    BookForm(fields): BookForm,
) -> Result<Redirect, ApiError> {
    let book = state
        .store
        .create(fields)
        .await
        .map_err(|e| state.reject(Operation::Create, e))?;
    tracing::info!(id = book.id, "book created");
    Ok(Redirect::to("/"))
}

/// PUT /books/{id} - overwrite the fields present in the form
async fn update_book(
    State(state): State<Arc<AppState>>,
    BookId(id): BookId,
    BookForm(fields): BookForm,
) -> Result<Json<Book>, ApiError> {
    let book = state
        .store
        .update(id, fields)
        .await
        .map_err(|e| state.reject(Operation::Update, e))?;
    Ok(Json(book))
}

/// DELETE /books/{id}
async fn delete_book(
    State(state): State<Arc<AppState>>,
    BookId(id): BookId,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store
        .delete(id)
        .await
        .map_err(|e| state.reject(Operation::Delete, e))?;
    tracing::info!(id, "book deleted");
    Ok(Json(MessageResponse {
        message: "Book deleted",
    }))
}

/// Book routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/{id}", put(update_book).delete(delete_book))
}
