//! HTTP server layer
//!
//! Axum server with:
//! - Book CRUD routes over any `BookStore`
//! - Request tracing and Prometheus request metrics
//! - Graceful shutdown
//! - JSON error responses

pub mod error;
pub mod extractors;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerConfig};
