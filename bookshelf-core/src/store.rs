//! The storage contract implemented by every backend

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::book::{Book, BookFields};
use crate::error::Result;

/// Which substrate holds the records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Postgres,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store operation, used as log context and metric label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Update,
    Delete,
    Health,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Health => "health",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CRUD access to book records.
///
/// Implementations must be safe to call concurrently. `update` and `delete`
/// check existence and mutate in one critical section, so callers never
/// observe a partial update.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All records, ascending by id
    async fn list_all(&self) -> Result<Vec<Book>>;

    /// Create a record; every field must be present.
    ///
    /// A missing field fails with [`crate::StoreError::MissingField`] before
    /// any state is touched.
    async fn create(&self, fields: BookFields) -> Result<Book>;

    /// Overwrite the present fields of record `id` and return it.
    async fn update(&self, id: i64, fields: BookFields) -> Result<Book>;

    /// Remove record `id`.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<()>;

    fn kind(&self) -> BackendKind;
}
