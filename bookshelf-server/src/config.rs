//! Database configuration - environment loading
//!
//! Configuration is loaded from environment variables:
//! - `DB_HOST`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`: required
//! - `DB_PORT`: server port (default: 5432)
//! - `DB_POOL_MIN` / `DB_POOL_MAX`: pool bounds (default: 1 / 10)
//! - `DB_CONNECT_TIMEOUT_SECS`: connect timeout (default: 5)
//! - `DB_STARTUP_ATTEMPTS` / `DB_STARTUP_DELAY_SECS`: startup probe (default: 30 / 2)

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::db::{PoolConfig, RetryPolicy};

const REQUIRED: [&str; 4] = ["DB_HOST", "DB_NAME", "DB_USER", "DB_PASSWORD"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// PostgreSQL connection settings
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub pool: PoolConfig,
    /// Applied when opening a connection, never to queries
    pub connect_timeout: Duration,
    pub startup_retry: RetryPolicy,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"********")
            .field("pool", &self.pool)
            .field("connect_timeout", &self.connect_timeout)
            .field("startup_retry", &self.startup_retry)
            .finish()
    }
}

impl DatabaseConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup (for testing)
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let missing: Vec<&'static str> = REQUIRED
            .into_iter()
            .filter(|key| lookup(*key).map_or(true, |v| v.trim().is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let required = |key: &str| lookup(key).unwrap_or_default();
        let defaults = PoolConfig::default();
        let startup = RetryPolicy::startup();

        let pool = PoolConfig {
            min_connections: parse_or(&lookup, "DB_POOL_MIN", defaults.min_connections)?,
            max_connections: parse_or(&lookup, "DB_POOL_MAX", defaults.max_connections)?,
            acquire_timeout: defaults.acquire_timeout,
        };
        if pool.validate().is_err() {
            return Err(ConfigError::Invalid {
                var: "DB_POOL_MIN",
                value: format!("{} (DB_POOL_MAX is {})", pool.min_connections, pool.max_connections),
            });
        }

        Ok(Self {
            host: required("DB_HOST"),
            port: parse_or(&lookup, "DB_PORT", 5432)?,
            name: required("DB_NAME"),
            user: required("DB_USER"),
            password: required("DB_PASSWORD"),
            pool,
            connect_timeout: Duration::from_secs(parse_or(&lookup, "DB_CONNECT_TIMEOUT_SECS", 5)?),
            startup_retry: RetryPolicy::fixed(
                parse_or(&lookup, "DB_STARTUP_ATTEMPTS", startup.max_attempts)?,
                Duration::from_secs(parse_or(
                    &lookup,
                    "DB_STARTUP_DELAY_SECS",
                    startup.delay.as_secs(),
                )?),
            ),
        })
    }
}

fn parse_or<L, T>(lookup: &L, var: &'static str, default: T) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const MINIMAL: [(&str, &str); 4] = [
        ("DB_HOST", "db"),
        ("DB_NAME", "books"),
        ("DB_USER", "app"),
        ("DB_PASSWORD", "secret"),
    ];

    #[test]
    fn defaults_apply() {
        let config = DatabaseConfig::from_lookup(lookup(&MINIMAL)).unwrap();
        assert_eq!(config.port, 5432);
        assert_eq!(config.pool, PoolConfig::default());
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.startup_retry, RetryPolicy::startup());
    }

    #[test]
    fn lists_every_missing_variable() {
        let err = DatabaseConfig::from_lookup(lookup(&[("DB_HOST", "db"), ("DB_USER", "")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec!["DB_NAME", "DB_USER", "DB_PASSWORD"])
        );
        assert_eq!(
            err.to_string(),
            "missing required environment variables: DB_NAME, DB_USER, DB_PASSWORD"
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = MINIMAL.to_vec();
        pairs.extend([
            ("DB_PORT", "6543"),
            ("DB_POOL_MIN", "2"),
            ("DB_POOL_MAX", "4"),
            ("DB_STARTUP_ATTEMPTS", "3"),
            ("DB_STARTUP_DELAY_SECS", "1"),
        ]);
        let config = DatabaseConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 6543);
        assert_eq!(config.pool.min_connections, 2);
        assert_eq!(config.pool.max_connections, 4);
        assert_eq!(
            config.startup_retry,
            RetryPolicy::fixed(3, Duration::from_secs(1))
        );
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let mut pairs = MINIMAL.to_vec();
        pairs.push(("DB_PORT", "fivefourthreetwo"));
        let err = DatabaseConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "DB_PORT",
                value: "fivefourthreetwo".into()
            }
        );
    }

    #[test]
    fn pool_bounds_are_checked() {
        let mut pairs = MINIMAL.to_vec();
        pairs.extend([("DB_POOL_MIN", "8"), ("DB_POOL_MAX", "4")]);
        let err = DatabaseConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "DB_POOL_MIN", .. }));
    }

    #[test]
    fn debug_hides_password() {
        let config = DatabaseConfig::from_lookup(lookup(&MINIMAL)).unwrap();
        assert!(!format!("{config:?}").contains("secret"));
    }
}
