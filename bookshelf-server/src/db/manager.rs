//! Connection source selected at startup: pooled or direct

use std::fmt;
use std::sync::Arc;

use super::connector::ConnectionFactory;
use super::error::DbError;
use super::pool::{ConnectionPool, Lease, PoolConfig, PoolStats};
use super::retry::{retry, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Pooled,
    Direct,
}

impl fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pooled => "pooled",
            Self::Direct => "direct",
        })
    }
}

/// Opens a fresh connection for every lease and closes it on release.
///
/// Opening retries on its own short policy, separate from the startup probe.
pub struct DirectConnector<F: ConnectionFactory> {
    factory: Arc<F>,
    retry: RetryPolicy,
}

impl<F: ConnectionFactory> DirectConnector<F> {
    pub fn new(factory: Arc<F>, retry: RetryPolicy) -> Self {
        Self { factory, retry }
    }

    pub async fn acquire(&self) -> Result<Lease<F::Connection>, DbError> {
        let conn = retry(self.retry, "direct connection", || self.factory.connect()).await?;
        Ok(Lease::closing(conn))
    }
}

/// Hands out connections without callers knowing where they come from
pub enum ConnectionManager<F: ConnectionFactory> {
    Pooled(ConnectionPool<F>),
    Direct(DirectConnector<F>),
}

impl<F: ConnectionFactory> ConnectionManager<F> {
    /// Build a manager for `mode`, initializing the pool when pooled.
    ///
    /// A pool that fails to initialize is still returned; it serves ad-hoc
    /// connections until restarted.
    pub async fn start(
        factory: Arc<F>,
        mode: ConnectionMode,
        pool: PoolConfig,
        per_call: RetryPolicy,
    ) -> Result<Self, DbError> {
        match mode {
            ConnectionMode::Pooled => {
                let pool = ConnectionPool::new(factory, pool)?;
                if let Err(e) = pool.initialize().await {
                    tracing::warn!(error = %e, "pool initialization failed, using ad-hoc connections");
                }
                Ok(Self::Pooled(pool))
            }
            ConnectionMode::Direct => Ok(Self::Direct(DirectConnector::new(factory, per_call))),
        }
    }

    pub async fn acquire(&self) -> Result<Lease<F::Connection>, DbError> {
        match self {
            Self::Pooled(pool) => pool.acquire().await,
            Self::Direct(direct) => direct.acquire().await,
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        match self {
            Self::Pooled(_) => ConnectionMode::Pooled,
            Self::Direct(_) => ConnectionMode::Direct,
        }
    }

    /// Pool counters; `None` in direct mode
    pub fn stats(&self) -> Option<PoolStats> {
        match self {
            Self::Pooled(pool) => Some(pool.stats()),
            Self::Direct(_) => None,
        }
    }
}
