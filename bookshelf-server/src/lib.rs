//! bookshelf-server: book CRUD over HTTP
//!
//! Serves the book routes from either an in-memory store or PostgreSQL,
//! and exposes request metrics on a separate listener.

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;

use std::sync::Arc;

use bookshelf_core::{BackendKind, MemoryStore};

pub use config::{ConfigError, DatabaseConfig};
pub use db::{ConnectionMode, PgStore};
pub use error::{Result, ServerError};
pub use http::{build_router, AppState, ServerConfig};
pub use metrics::Metrics;

/// Everything `serve` needs to start
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub server: ServerConfig,
    pub backend: BackendKind,
    /// Ignored by the memory backend
    pub connection_mode: ConnectionMode,
    /// Start from the six seed books (postgres: only when the table is empty)
    pub seed: bool,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            backend: BackendKind::Memory,
            connection_mode: ConnectionMode::Pooled,
            seed: true,
        }
    }
}

/// Build the selected backend and serve until shutdown.
///
/// For postgres, missing `DB_*` configuration or a database that stays
/// unreachable through the startup probe is an error, and no listener is
/// bound.
pub async fn serve(options: ServeOptions) -> Result<()> {
    let metrics = Metrics::new()?;

    let state = match options.backend {
        BackendKind::Memory => {
            let store = if options.seed {
                MemoryStore::seeded()
            } else {
                MemoryStore::new()
            };
            AppState::new(Arc::new(store), metrics)
        }
        BackendKind::Postgres => {
            let config = DatabaseConfig::from_env()?;
            tracing::debug!(?config, "database config loaded");
            let store = Arc::new(PgStore::open(&config, options.connection_mode, options.seed).await?);
            AppState::new(store.clone(), metrics).with_pool_stats(store)
        }
    };

    tracing::info!(backend = %options.backend, "store ready");
    http::run_server(state, options.server).await
}

/// Run the startup probe once against the configured database.
pub async fn check_database() -> Result<()> {
    let config = DatabaseConfig::from_env()?;
    let connector = db::PgConnector::new(&config);
    db::wait_until_available(&connector, config.startup_retry).await?;
    Ok(())
}
