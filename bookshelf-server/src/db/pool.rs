//! Bounded connection pool
//!
//! A semaphore with `max_connections` permits guards a free list of idle
//! connections. Each checkout holds one permit inside its [`Lease`]; the
//! lease puts the connection back and frees the permit when dropped.
//!
//! When the pool is exhausted (no permit within `acquire_timeout`) or was
//! never initialized, `acquire` opens an ad-hoc connection outside the pool
//! and logs the degradation. Ad-hoc leases close their connection on drop.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::connector::ConnectionFactory;
use super::error::DbError;

/// Default maximum connections for the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connections opened when the pool initializes.
const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Default wait for a free slot before falling back to an ad-hoc connection.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), DbError> {
        if self.min_connections == 0 || self.min_connections > self.max_connections {
            return Err(DbError::InvalidPoolSize {
                min: self.min_connections,
                max: self.max_connections,
            });
        }
        Ok(())
    }
}

/// Point-in-time pool counters, reported by `/health`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub max_connections: u32,
    pub idle: usize,
    pub in_use: usize,
    pub created: u64,
    pub reused: u64,
    pub fallbacks: u64,
    pub discarded: u64,
}

/// Anything that can report pool statistics
pub trait PoolStatsSource: Send + Sync {
    fn pool_stats(&self) -> Option<PoolStats>;
}

struct PoolShared<C> {
    idle: Mutex<Vec<C>>,
    created: AtomicU64,
    reused: AtomicU64,
    fallbacks: AtomicU64,
    discarded: AtomicU64,
}

impl<C> PoolShared<C> {
    fn new(capacity: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    fn idle(&self) -> std::sync::MutexGuard<'_, Vec<C>> {
        // A panic while holding the lock cannot leave the Vec half-updated.
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Release<C> {
    /// Return to the free list, then free the slot
    Pool {
        shared: Arc<PoolShared<C>>,
        _permit: OwnedSemaphorePermit,
    },
    /// Close on release
    Close,
}

/// Scoped handle on a connection.
///
/// Dropping the lease releases the connection: pooled leases return it to
/// the pool, ad-hoc and direct leases close it.
pub struct Lease<C> {
    conn: Option<C>,
    release: Release<C>,
}

impl<C> Lease<C> {
    /// Lease whose connection is closed on release
    pub fn closing(conn: C) -> Self {
        Self {
            conn: Some(conn),
            release: Release::Close,
        }
    }

    fn pooled(conn: C, shared: Arc<PoolShared<C>>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            conn: Some(conn),
            release: Release::Pool {
                shared,
                _permit: permit,
            },
        }
    }

    /// True if the connection goes back to a pool on release
    pub fn is_pooled(&self) -> bool {
        matches!(self.release, Release::Pool { .. })
    }

    /// Close the connection instead of returning it to the pool.
    ///
    /// Used after errors that leave the connection in an unknown state.
    pub fn discard(mut self) {
        if let Release::Pool { shared, .. } = &self.release {
            shared.discarded.fetch_add(1, Ordering::Relaxed);
        }
        drop(self.conn.take());
    }
}

impl<C> Deref for Lease<C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.conn.as_ref().expect("lease holds a connection until dropped")
    }
}

impl<C> DerefMut for Lease<C> {
    fn deref_mut(&mut self) -> &mut C {
        self.conn.as_mut().expect("lease holds a connection until dropped")
    }
}

impl<C> Drop for Lease<C> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match &self.release {
            // Push before the permit field drops, so the next holder of
            // that permit finds the connection idle.
            Release::Pool { shared, .. } => shared.idle().push(conn),
            Release::Close => drop(conn),
        }
    }
}

/// Bounded pool of reusable connections
pub struct ConnectionPool<F: ConnectionFactory> {
    factory: Arc<F>,
    config: PoolConfig,
    slots: Arc<Semaphore>,
    shared: Arc<PoolShared<F::Connection>>,
    initialized: AtomicBool,
}

impl<F: ConnectionFactory> ConnectionPool<F> {
    /// Create an empty, uninitialized pool.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidPoolSize`] unless
    /// `1 <= min_connections <= max_connections`.
    pub fn new(factory: Arc<F>, config: PoolConfig) -> Result<Self, DbError> {
        config.validate()?;
        Ok(Self {
            factory,
            slots: Arc::new(Semaphore::new(config.max_connections as usize)),
            shared: Arc::new(PoolShared::new(config.max_connections as usize)),
            config,
            initialized: AtomicBool::new(false),
        })
    }

    /// Open `min_connections` connections up front.
    ///
    /// On failure the pool stays uninitialized and every `acquire` falls
    /// back to ad-hoc connections.
    pub async fn initialize(&self) -> Result<(), DbError> {
        let mut opened = Vec::with_capacity(self.config.min_connections as usize);
        for _ in 0..self.config.min_connections {
            opened.push(self.factory.connect().await?);
        }
        self.shared
            .created
            .fetch_add(opened.len() as u64, Ordering::Relaxed);
        self.shared.idle().extend(opened);
        self.initialized.store(true, Ordering::Release);

        tracing::info!(
            min_connections = self.config.min_connections,
            max_connections = self.config.max_connections,
            "connection pool initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Check out a connection, falling back to an ad-hoc one when the pool
    /// is exhausted or uninitialized.
    pub async fn acquire(&self) -> Result<Lease<F::Connection>, DbError> {
        if !self.is_initialized() {
            return self.fallback("pool not initialized").await;
        }

        let permit = match tokio::time::timeout(
            self.config.acquire_timeout,
            self.slots.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            // Timed out, or the semaphore was closed
            _ => return self.fallback("pool exhausted").await,
        };

        let conn = match self.checkout_idle().await {
            Some(conn) => conn,
            // The permit is dropped with the error, so a failed open frees its slot.
            None => {
                let conn = self.factory.connect().await?;
                self.shared.created.fetch_add(1, Ordering::Relaxed);
                conn
            }
        };

        Ok(Lease::pooled(conn, self.shared.clone(), permit))
    }

    /// Pop idle connections until one answers a ping. Stale ones are
    /// closed and counted as discarded.
    async fn checkout_idle(&self) -> Option<F::Connection> {
        loop {
            let next = self.shared.idle().pop();
            let mut conn = next?;
            match self.factory.ping(&mut conn).await {
                Ok(()) => {
                    self.shared.reused.fetch_add(1, Ordering::Relaxed);
                    return Some(conn);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping stale pooled connection");
                    self.shared.discarded.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    async fn fallback(&self, reason: &'static str) -> Result<Lease<F::Connection>, DbError> {
        tracing::warn!(reason, "opening ad-hoc connection outside the pool");
        self.shared.fallbacks.fetch_add(1, Ordering::Relaxed);
        let conn = self.factory.connect().await?;
        Ok(Lease::closing(conn))
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            max_connections: self.config.max_connections,
            idle: self.shared.idle().len(),
            in_use: self.config.max_connections as usize - self.slots.available_permits(),
            created: self.shared.created.load(Ordering::Relaxed),
            reused: self.shared.reused.load(Ordering::Relaxed),
            fallbacks: self.shared.fallbacks.load(Ordering::Relaxed),
            discarded: self.shared.discarded.load(Ordering::Relaxed),
        }
    }
}
