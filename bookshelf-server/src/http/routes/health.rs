//! Health check endpoint (postgres backend)

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use bookshelf_core::{BackendKind, Operation};
use serde::Serialize;

use crate::db::PoolStats;
use crate::http::server::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: BackendKind,
    pub database: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health - 200 when the database answers, 503 otherwise
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let pool = state.pool_stats.as_ref().and_then(|s| s.pool_stats());

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                backend: state.store.kind(),
                database: "connected",
                version: env!("CARGO_PKG_VERSION"),
                pool,
                error: None,
            }),
        ),
        Err(e) => {
            let message = e.to_string();
            state.reject(Operation::Health, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    backend: state.store.kind(),
                    database: "disconnected",
                    version: env!("CARGO_PKG_VERSION"),
                    pool,
                    error: Some(message),
                }),
            )
        }
    }
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
