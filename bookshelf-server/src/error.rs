//! Startup error types for bookshelf-server
//!
//! Anything returned here happens before or while binding listeners and
//! stops the process; request-time failures go through `http::ApiError`.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
