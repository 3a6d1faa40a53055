//! Deadline for store operations.
//!
//! Every [`PgStore`](super::PgStore) call runs under [`within`], so a stuck
//! lock or a slow query surfaces as a domain `Timeout` error instead of a hang.

use std::time::Duration;
use tokio::time::timeout;

/// Default deadline for one store operation, transaction included
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a bounded store operation
#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Bound a whole store operation that already returns a domain error.
///
/// When the deadline passes the future is dropped, which rolls back any open
/// transaction it owns. If the deadline hits during commit the outcome is
/// unknown to the caller.
pub async fn within<F, T, E>(duration: Duration, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(TimeoutError::Timeout(duration).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_display() {
        let err = TimeoutError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }

    #[derive(Debug)]
    struct Slow(Duration);

    impl From<TimeoutError> for Slow {
        fn from(err: TimeoutError) -> Self {
            match err {
                TimeoutError::Timeout(d) => Slow(d),
                TimeoutError::Database(_) => Slow(Duration::ZERO),
            }
        }
    }

    #[tokio::test]
    async fn test_within_reports_deadline() {
        let deadline = Duration::from_millis(10);
        let result: Result<(), Slow> = within(deadline, async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;
        assert_eq!(result.unwrap_err().0, deadline);
    }

    #[tokio::test]
    async fn test_within_passes_through_result() {
        let result: Result<u8, Slow> = within(DEFAULT_OPERATION_TIMEOUT, async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_within_passes_through_domain_error() {
        let result: Result<u8, Slow> = within(DEFAULT_OPERATION_TIMEOUT, async {
            Err(Slow(Duration::from_secs(3)))
        })
        .await;
        assert_eq!(result.unwrap_err().0, Duration::from_secs(3));
    }
}
