//! Table bootstrap for the books table
//!
//! Idempotent: creates the table if missing and seeds it only when empty.

use bookshelf_core::seed_books;
use sqlx::{Connection, PgConnection};

use super::error::DbError;

pub async fn ensure_schema(conn: &mut PgConnection, seed: bool) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            novel_title TEXT NOT NULL,
            author TEXT NOT NULL,
            publisher TEXT NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    if !seed {
        return Ok(());
    }

    let mut tx = conn.begin().await?;
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
        .fetch_one(&mut *tx)
        .await?;

    if count == 0 {
        let books = seed_books();
        for book in &books {
            sqlx::query(
                "INSERT INTO books (title, novel_title, author, publisher) VALUES ($1, $2, $3, $4)",
            )
            .bind(&book.title)
            .bind(&book.novel_title)
            .bind(&book.author)
            .bind(&book.publisher)
            .execute(&mut *tx)
            .await?;
        }
        tracing::info!(count = books.len(), "seeded empty books table");
    }

    tx.commit().await?;
    Ok(())
}
