//! Database layer - connection lifecycle and the PostgreSQL book store
//!
//! # Design Principles
//!
//! - Startup probe retries with a fixed delay, then gives up for good
//! - Every connection is handed out as a [`Lease`]; dropping it releases
//!   the connection, whatever path the caller leaves by
//! - Pooled mode degrades to ad-hoc connections instead of failing
//! - One statement per store operation, no check-then-write

pub mod connector;
pub mod error;
pub mod manager;
pub mod pool;
pub mod repo;
pub mod retry;
pub mod schema;

pub use connector::{ConnectionFactory, PgConnector};
pub use error::DbError;
pub use manager::{ConnectionManager, ConnectionMode, DirectConnector};
pub use pool::{ConnectionPool, Lease, PoolConfig, PoolStats, PoolStatsSource};
pub use repo::PgStore;
pub use retry::{retry, wait_until_available, RetryPolicy};
