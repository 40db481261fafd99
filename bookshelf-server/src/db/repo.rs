//! PostgreSQL book store
//!
//! Each operation leases one connection and runs one statement:
//! - update: `COALESCE` keeps absent fields, `RETURNING` reports the result
//! - delete: `rows_affected` tells found from not found
//! Connection-level failures discard the lease instead of pooling it.

use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_core::{BackendKind, Book, BookFields, BookStore, Operation, StoreError};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection};

use super::connector::PgConnector;
use super::error::{is_connection_error, DbError};
use super::manager::{ConnectionManager, ConnectionMode};
use super::pool::{Lease, PoolStats, PoolStatsSource};
use super::retry::{wait_until_available, RetryPolicy};
use super::schema::ensure_schema;
use crate::config::DatabaseConfig;

const BOOK_COLUMNS: &str = "id, title, novel_title, author, publisher, updated_at";

/// Book row from database
#[derive(Debug, Clone, FromRow)]
struct BookRow {
    id: i64,
    title: String,
    novel_title: String,
    author: String,
    publisher: String,
    updated_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            novel_title: row.novel_title,
            author: row.author,
            publisher: row.publisher,
            updated_at: Some(row.updated_at),
        }
    }
}

/// Book store backed by a `books` table
pub struct PgStore {
    connections: ConnectionManager<PgConnector>,
}

impl PgStore {
    pub fn new(connections: ConnectionManager<PgConnector>) -> Self {
        Self { connections }
    }

    /// Probe the database, start the connection manager and make sure the
    /// table exists.
    ///
    /// # Errors
    ///
    /// [`DbError::Unreachable`] if the database never answers within
    /// `config.startup_retry`; the caller must not serve traffic then.
    pub async fn open(
        config: &DatabaseConfig,
        mode: ConnectionMode,
        seed: bool,
    ) -> Result<Self, DbError> {
        let connector = Arc::new(PgConnector::new(config));
        wait_until_available(connector.as_ref(), config.startup_retry).await?;

        let connections =
            ConnectionManager::start(connector, mode, config.pool, RetryPolicy::per_call()).await?;
        tracing::info!(mode = %connections.mode(), host = %config.host, db = %config.name, "connected to postgres");

        let mut lease = connections.acquire().await?;
        ensure_schema(&mut lease, seed).await?;
        drop(lease);

        Ok(Self::new(connections))
    }

    async fn lease(&self, op: Operation) -> Result<Lease<PgConnection>, StoreError> {
        self.connections.acquire().await.map_err(|e| {
            tracing::error!(operation = %op, error = %e, "could not acquire connection");
            StoreError::unavailable(e.to_string())
        })
    }

    /// Release `lease` according to how the statement went, and map the
    /// error for the handler layer.
    fn finish<T>(
        &self,
        op: Operation,
        lease: Lease<PgConnection>,
        result: Result<T, sqlx::Error>,
    ) -> Result<T, StoreError> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connection_error(&e) {
                    lease.discard();
                }
                tracing::error!(operation = %op, error = %e, "query failed");
                Err(StoreError::unavailable(DbError::Query(e).to_string()))
            }
        }
    }
}

#[async_trait]
impl BookStore for PgStore {
    async fn list_all(&self) -> bookshelf_core::Result<Vec<Book>> {
        let mut conn = self.lease(Operation::List).await?;
        let result = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books ORDER BY id ASC"
        ))
        .fetch_all(&mut *conn)
        .await;

        let rows = self.finish(Operation::List, conn, result)?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn create(&self, fields: BookFields) -> bookshelf_core::Result<Book> {
        let new = fields.into_new_book()?;

        let mut conn = self.lease(Operation::Create).await?;
        let result = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            INSERT INTO books (title, novel_title, author, publisher)
            VALUES ($1, $2, $3, $4)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(&new.title)
        .bind(&new.novel_title)
        .bind(&new.author)
        .bind(&new.publisher)
        .fetch_one(&mut *conn)
        .await;

        let row = self.finish(Operation::Create, conn, result)?;
        tracing::debug!(id = row.id, "created book");
        Ok(row.into())
    }

    async fn update(&self, id: i64, fields: BookFields) -> bookshelf_core::Result<Book> {
        let mut conn = self.lease(Operation::Update).await?;
        // clock_timestamp() so updated_at moves even within one transaction
        let result = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                novel_title = COALESCE($3, novel_title),
                author = COALESCE($4, author),
                publisher = COALESCE($5, publisher),
                updated_at = clock_timestamp()
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(fields.title)
        .bind(fields.novel_title)
        .bind(fields.author)
        .bind(fields.publisher)
        .fetch_optional(&mut *conn)
        .await;

        self.finish(Operation::Update, conn, result)?
            .map(Book::from)
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete(&self, id: i64) -> bookshelf_core::Result<()> {
        let mut conn = self.lease(Operation::Delete).await?;
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await;

        let done = self.finish(Operation::Delete, conn, result)?;
        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn ping(&self) -> bookshelf_core::Result<()> {
        let mut conn = self.lease(Operation::Health).await?;
        let result = sqlx::query("SELECT 1").execute(&mut *conn).await;
        self.finish(Operation::Health, conn, result).map(|_| ())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }
}

impl PoolStatsSource for PgStore {
    fn pool_stats(&self) -> Option<PoolStats> {
        self.connections.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_core::NewBook;

    // Integration tests require a real database
    // Run with: DB_HOST=... DB_NAME=... DB_USER=... DB_PASSWORD=... cargo test -p bookshelf-server -- --ignored

    async fn open_store(mode: ConnectionMode) -> PgStore {
        let config = DatabaseConfig::from_env().expect("DB_* variables required");
        PgStore::open(&config, mode, false)
            .await
            .expect("database unreachable")
    }

    fn fields() -> BookFields {
        NewBook::new("The Expanse", "Persepolis Rising", "James S. A. Corey", "Orbit Book").into()
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn crud_round_trip() {
        let store = open_store(ConnectionMode::Pooled).await;

        let created = store.create(fields()).await.expect("create failed");
        let listed = store.list_all().await.expect("list failed");
        assert!(listed.iter().any(|b| b.id == created.id));
        assert!(listed.windows(2).all(|w| w[0].id < w[1].id));

        let updated = store
            .update(created.id, BookFields::default())
            .await
            .expect("update failed");
        assert_eq!(updated.novel_title, created.novel_title);
        assert!(updated.updated_at > created.updated_at);

        store.delete(created.id).await.expect("delete failed");
        assert!(matches!(
            store.delete(created.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.pool_stats().is_some());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn direct_mode_serves_requests() {
        let store = open_store(ConnectionMode::Direct).await;
        store.ping().await.expect("ping failed");
        assert!(matches!(
            store.update(i64::MAX, fields()).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.pool_stats().is_none());
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn missing_field_never_reaches_database() {
        let store = open_store(ConnectionMode::Pooled).await;
        let before = store.list_all().await.unwrap().len();
        let mut partial = fields();
        partial.title = None;
        assert!(matches!(
            store.create(partial).await,
            Err(StoreError::MissingField("title"))
        ));
        assert_eq!(store.list_all().await.unwrap().len(), before);
    }
}
