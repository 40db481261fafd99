//! Axum server setup
//!
//! Two listeners share one shutdown signal:
//! - the service listener with the book routes
//! - the metrics listener with `/metrics`

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use bookshelf_core::{BackendKind, BookStore, Operation, StoreError};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use super::error::ApiError;
use super::routes;
use crate::db::PoolStatsSource;
use crate::error::ServerError;
use crate::metrics::{self, Metrics};

/// Listener addresses
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Service address (default: 0.0.0.0:8080)
    pub bind_addr: SocketAddr,

    /// Scrape address, kept apart from the service (default: 0.0.0.0:9090)
    pub metrics_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookStore>,
    pub metrics: Metrics,
    /// Pool counters for `/health`, when the backend has a pool
    pub pool_stats: Option<Arc<dyn PoolStatsSource>>,
}

impl AppState {
    pub fn new(store: Arc<dyn BookStore>, metrics: Metrics) -> Self {
        Self {
            store,
            metrics,
            pool_stats: None,
        }
    }

    pub fn with_pool_stats(mut self, source: Arc<dyn PoolStatsSource>) -> Self {
        self.pool_stats = Some(source);
        self
    }

    /// Turn a store failure into a response, logging and counting backend
    /// failures against `op`.
    pub fn reject(&self, op: Operation, err: StoreError) -> ApiError {
        if err.is_backend_failure() {
            tracing::error!(operation = %op, error = %err, "backend failure");
            self.metrics.record_backend_error(op);
        } else {
            tracing::debug!(operation = %op, error = %err, "request rejected");
        }
        ApiError::from(err)
    }
}

/// Build the service router.
///
/// `/health` is only mounted for the postgres backend.
pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new()
        .merge(routes::home::router())
        .merge(routes::books::router());

    if state.store.kind() == BackendKind::Postgres {
        app = app.merge(routes::health::router());
    }

    app.layer(middleware::from_fn_with_state(
        state.metrics.clone(),
        metrics::track_requests,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(Arc::new(state))
}

/// Run the service and metrics listeners until Ctrl+C or SIGTERM.
///
/// # Example
///
/// ```ignore
/// let state = AppState::new(Arc::new(MemoryStore::seeded()), Metrics::new()?);
/// run_server(state, ServerConfig::default()).await?;
/// ```
pub async fn run_server(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let metrics_app = metrics::router(state.metrics.clone());
    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    let metrics_listener = TcpListener::bind(config.metrics_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);
    tracing::info!("Metrics listening on {}/metrics", config.metrics_addr);

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    tokio::try_join!(
        axum::serve(listener, app)
            .with_graceful_shutdown(stopped(stop_rx.clone()))
            .into_future(),
        axum::serve(metrics_listener, metrics_app)
            .with_graceful_shutdown(stopped(stop_rx))
            .into_future(),
    )?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn stopped(mut rx: watch::Receiver<bool>) {
    // A dropped sender also ends the wait.
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}
