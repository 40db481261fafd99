//! Opening raw database connections

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;

use super::error::DbError;
use crate::config::DatabaseConfig;

/// Something that can open and check connections.
///
/// The pool, the direct connector and the startup probe are written against
/// this trait, so they work the same for PostgreSQL and for test doubles.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Open a fresh connection
    async fn connect(&self) -> Result<Self::Connection, DbError>;

    /// Trivial round trip to check the connection works
    async fn ping(&self, conn: &mut Self::Connection) -> Result<(), DbError>;
}

/// Opens PostgreSQL connections from `DB_*` settings
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .password(&config.password)
            .application_name("bookshelf");

        Self {
            options,
            connect_timeout: config.connect_timeout,
        }
    }
}

#[async_trait]
impl ConnectionFactory for PgConnector {
    type Connection = PgConnection;

    async fn connect(&self) -> Result<PgConnection, DbError> {
        // The timeout applies to connection setup only, never to queries.
        match tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
        {
            Ok(result) => result.map_err(DbError::Connect),
            Err(_) => Err(DbError::ConnectTimeout(self.connect_timeout)),
        }
    }

    async fn ping(&self, conn: &mut PgConnection) -> Result<(), DbError> {
        conn.ping().await.map_err(DbError::Query)
    }
}
