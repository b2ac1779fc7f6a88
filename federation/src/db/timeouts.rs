//! Database operation timeout helpers
//!
//! Bound every storage round trip so a stuck lock or connection surfaces as a
//! retryable failure instead of an indefinite hang.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for long-running operations such as schema setup (30 seconds)
pub const LONG_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Row lock wait inside a transaction, kept below the transaction timeout
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Operation exceeded its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Database operation timed out after {0:?}")]
pub struct TimeoutError(pub Duration);

/// Run a fallible operation with a deadline.
///
/// The operation's own error type absorbs the timeout, so callers keep a single
/// error type.
///
/// # Example
///
/// ```no_run
/// use federation::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// use federation::tournament::TournamentError;
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> Result<(), TournamentError> {
///
/// with_timeout(DEFAULT_QUERY_TIMEOUT, async {
///     sqlx::query("SELECT 1").execute(pool).await?;
///     Ok::<_, TournamentError>(())
/// })
/// .await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutError(duration).into()),
    }
}

/// Run an operation with the default query timeout (5 seconds)
pub async fn with_default_timeout<F, T, E>(future: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
