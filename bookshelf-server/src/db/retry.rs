//! Bounded retry for connection attempts
//!
//! Two policies are in play: the startup probe (many attempts, fixed delay)
//! and per-call connection opening in direct mode (few attempts, short
//! delay growing per attempt).

use std::future::Future;
use std::time::Duration;

use super::connector::ConnectionFactory;
use super::error::DbError;

/// How the delay between attempts evolves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,
    /// `delay * attempt` before retry number `attempt`
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    pub const fn linear(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Linear,
        }
    }

    /// Startup probe: 30 attempts, 2 seconds apart
    pub const fn startup() -> Self {
        Self::fixed(30, Duration::from_secs(2))
    }

    /// Direct-mode connection opening: 3 attempts, 200ms growing per attempt
    pub const fn per_call() -> Self {
        Self::linear(3, Duration::from_millis(200))
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(attempt),
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::startup()
    }
}

/// Run `op` until it succeeds or `policy` runs out of attempts.
///
/// Exhaustion returns [`DbError::Unreachable`] wrapping the last failure.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(what, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt >= max_attempts => {
                tracing::error!(what, attempts = attempt, error = %err, "giving up");
                return Err(DbError::Unreachable {
                    attempts: attempt,
                    last_error: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    what,
                    attempt,
                    max_attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Block until the database accepts a connection and answers a ping.
///
/// Meant for process startup: an `Err` here means the service must not
/// start serving traffic.
pub async fn wait_until_available<F: ConnectionFactory>(
    factory: &F,
    policy: RetryPolicy,
) -> Result<(), DbError> {
    retry(policy, "database availability probe", || async {
        let mut conn = factory.connect().await?;
        factory.ping(&mut conn).await
    })
    .await?;

    tracing::info!("database is available");
    Ok(())
}
