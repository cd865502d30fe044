//! Exponential backoff around fallible async calls.

use crate::error::ApiError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const READ_ATTEMPTS: u32 = 3;
    pub const MUTATION_ATTEMPTS: u32 = 2;
    /// Retries the query layer adds on top of its first attempt.
    pub const QUERY_RETRIES: u32 = 3;

    pub fn reads() -> Self {
        Self {
            max_attempts: Self::READ_ATTEMPTS,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Outer policy around a whole cached query. Each of its attempts runs
    /// a full `reads()` cycle, so the two layers multiply.
    pub fn queries() -> Self {
        Self {
            max_attempts: 1 + Self::QUERY_RETRIES,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn mutations() -> Self {
        Self {
            max_attempts: Self::MUTATION_ATTEMPTS,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }

    /// Never retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Wait before the attempt following `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt ceiling is reached. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    debug!(%label, kind = %err.kind, "not retrying");
                    return Err(err);
                }
                Err(err) if attempt >= max_attempts => {
                    warn!(%label, attempts = attempt, kind = %err.kind, "giving up");
                    return Err(err);
                }
                Err(err) => {
                    let wait = self.delay_for(attempt);
                    debug!(
                        %label,
                        kind = %err.kind,
                        next_attempt = attempt + 1,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        "retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::reads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delays_double_and_cap() {
        let p = RetryPolicy::reads();
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(2), Duration::from_secs(2));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
        assert_eq!(p.delay_for(10), Duration::from_secs(30));
        assert_eq!(RetryPolicy::mutations().delay_for(8), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_surfaced_after_one_attempt() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = RetryPolicy::reads()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::new(ErrorKind::NotFound)) }
            })
            .await;
        assert_eq!(res.unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn query_layer_composes_with_read_layer() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let inner = RetryPolicy::reads();
        let inner = &inner;
        let res: Result<(), _> = RetryPolicy::queries()
            .run("query", move || {
                inner.run("read", move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(ApiError::new(ErrorKind::Server)) }
                })
            })
            .await;
        assert_eq!(res.unwrap_err().kind, ErrorKind::Server);
        assert_eq!(
            calls.load(Ordering::SeqCst),
            RetryPolicy::READ_ATTEMPTS * (1 + RetryPolicy::QUERY_RETRIES)
        );
    }

    #[test]
    fn query_delays_follow_attempt_index() {
        let p = RetryPolicy::queries();
        assert_eq!(p.max_attempts, 4);
        assert_eq!(p.delay_for(1), Duration::from_secs(1));
        assert_eq!(p.delay_for(3), Duration::from_secs(4));
        assert_eq!(p.delay_for(6), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_uses_every_attempt() {
        let calls = AtomicU32::new(0);
        let res: Result<(), _> = RetryPolicy::reads()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::new(ErrorKind::Timeout)) }
            })
            .await;
        assert_eq!(res.unwrap_err().kind, ErrorKind::Timeout);
        assert_eq!(calls.load(Ordering::SeqCst), RetryPolicy::READ_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn mutation_ceiling_is_two() {
        let calls = AtomicU32::new(0);
        let _ = RetryPolicy::mutations()
            .run::<(), _, _>("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ApiError::new(ErrorKind::Server)) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let res = RetryPolicy::reads()
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ApiError::new(ErrorKind::RateLimited))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(res.unwrap(), 1);
    }
}
