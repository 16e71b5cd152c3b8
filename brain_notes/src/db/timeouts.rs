//! Deadlines for database round trips.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

/// Deadline for the health probe and other single-statement checks
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for applying migrations at startup
pub const MIGRATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Database-level failures outside the per-query error types
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Run `future` and give up after `duration`
pub async fn with_timeout<F, T, E>(duration: Duration, future: F) -> DbResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<DbError>,
{
    match timeout(duration, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(DbError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_future_passes_through() {
        let value = with_timeout(Duration::from_millis(50), async {
            Ok::<_, sqlx::Error>(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_slow_future_times_out() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, sqlx::Error>(())
        })
        .await;

        match result {
            Err(DbError::Timeout(d)) => assert_eq!(d, Duration::from_millis(10)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_error_is_wrapped() {
        let result = with_timeout(HEALTH_CHECK_TIMEOUT, async {
            Err::<(), _>(sqlx::Error::RowNotFound)
        })
        .await;
        assert!(matches!(result, Err(DbError::Query(sqlx::Error::RowNotFound))));
    }
}
