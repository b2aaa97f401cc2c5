//! Timeout wrapper for backend calls

use crate::error::DashboardError;
use std::future::Future;
use std::time::{Duration, Instant};

/// Default limit for a dashboard or auth request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    duration: Duration,
}

impl TimeoutPolicy {
    /// Create a timeout policy. Panics if duration is zero or `Duration::MAX`;
    /// [`DashboardConfig`](crate::config::DashboardConfig) validates before calling this.
    pub fn new(duration: Duration) -> Self {
        assert!(
            duration > Duration::ZERO && duration < Duration::MAX,
            "timeout duration must be non-zero and finite",
        );
        Self { duration }
    }

    /// Inspect the configured timeout duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run `operation`, failing with [`DashboardError::Timeout`] if it outlives the limit.
    /// The operation's future is dropped on timeout, which cancels the request.
    pub async fn execute<T, Fut, Op>(&self, operation: Op) -> Result<T, DashboardError>
    where
        Fut: Future<Output = Result<T, DashboardError>>,
        Op: FnOnce() -> Fut,
    {
        let start = Instant::now();

        match tokio::time::timeout(self.duration, operation()).await {
            Ok(result) => result,
            Err(_) => {
                let elapsed = start.elapsed();
                Err(DashboardError::Timeout { elapsed, timeout: self.duration })
            }
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn completes_before_timeout() {
        let timeout = TimeoutPolicy::new(Duration::from_millis(100));
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let result = timeout
            .execute(|| {
                let counter = counter_clone.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, DashboardError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_slow_fetch() {
        let timeout = TimeoutPolicy::new(Duration::from_secs(10));

        let result = timeout
            .execute(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, DashboardError>(())
            })
            .await;

        match result.unwrap_err() {
            DashboardError::Timeout { elapsed, timeout } => {
                assert_eq!(timeout, Duration::from_secs(10));
                assert!(elapsed >= Duration::ZERO);
            }
            e => panic!("Expected Timeout error, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn propagates_operation_errors() {
        let timeout = TimeoutPolicy::new(Duration::from_secs(1));

        let result = timeout
            .execute(|| async { Err::<(), _>(DashboardError::Network("refused".to_string())) })
            .await;

        assert!(result.unwrap_err().is_network());
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_duration_panics() {
        let _ = TimeoutPolicy::new(Duration::ZERO);
    }
}
