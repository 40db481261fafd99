//! Database error type

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("database unreachable after {attempts} attempts: {last_error}")]
    Unreachable {
        attempts: u32,
        last_error: Box<DbError>,
    },

    #[error("invalid pool size: min_connections {min} must be between 1 and max_connections {max}")]
    InvalidPoolSize { min: u32, max: u32 },

    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Errors after which a connection must be discarded rather than reused
pub fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
