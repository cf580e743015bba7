//! Bounded exponential-backoff retry for remote calls.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retryable,
    NonRetryable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Retries after the first attempt; `max_retries + 1` calls at most.
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Schedule for report downloads: three attempts, waiting 24s then ~41s.
    pub fn for_downloads() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(24),
            max_delay: Duration::from_secs(120),
            multiplier: 1.7,
        }
    }

    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt_index: usize) -> Duration {
        let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled)
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync + fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fake clock: records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub async fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().await.clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().await.push(duration);
    }
}

/// A backoff schedule bound to the clock it sleeps on.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    backoff: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    pub fn new(backoff: BackoffPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { backoff, sleeper }
    }

    pub fn with_tokio(backoff: BackoffPolicy) -> Self {
        Self::new(backoff, Arc::new(TokioSleeper))
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Run `operation` until it succeeds, fails with an error `classify` deems
    /// non-retryable, or the attempt ceiling is reached. The last error is returned.
    pub async fn run<T, E, F, Fut, C>(
        &self,
        operation_name: &str,
        classify: C,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> RetryDisposition,
        E: fmt::Display,
    {
        let mut attempt = 0usize;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err)
                    if classify(&err) == RetryDisposition::Retryable
                        && attempt < self.backoff.max_retries =>
                {
                    let delay = self.backoff.delay_for_attempt(attempt);
                    warn!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retryable failure; backing off"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    enum Scripted {
        Busy,
        Broken,
    }

    impl fmt::Display for Scripted {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{self:?}")
        }
    }

    fn classify(err: &Scripted) -> RetryDisposition {
        match err {
            Scripted::Busy => RetryDisposition::Retryable,
            Scripted::Broken => RetryDisposition::NonRetryable,
        }
    }

    fn policy(max_retries: usize) -> (RetryPolicy, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let backoff = BackoffPolicy {
            max_retries,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
        };
        (RetryPolicy::new(backoff, sleeper.clone()), sleeper)
    }

    #[test]
    fn backoff_logic_is_exponential_and_capped() {
        let policy = BackoffPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(350));
        assert_eq!(policy.delay_for_attempt(500), Duration::from_millis(350));
    }

    #[test]
    fn download_schedule_matches_expected_waits() {
        let policy = BackoffPolicy::for_downloads();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(24));
        let second = policy.delay_for_attempt(1).as_secs_f64();
        assert!((second - 40.8).abs() < 1e-6, "got {second}");
    }

    #[tokio::test]
    async fn retries_rate_limits_then_succeeds() {
        let (policy, sleeper) = policy(3);
        let calls = AtomicUsize::new(0);

        let result = policy
            .run("download", classify, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(Scripted::Busy)
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(
            sleeper.recorded().await,
            vec![Duration::from_millis(100), Duration::from_millis(200)]
        );
    }

    #[tokio::test]
    async fn exhausted_retries_surface_last_error() {
        let (policy, sleeper) = policy(2);
        let calls = AtomicUsize::new(0);

        let result: Result<(), Scripted> = policy
            .run("download", classify, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Scripted::Busy) }
            })
            .await;

        assert_eq!(result, Err(Scripted::Busy));
        assert_eq!(calls.load(Ordering::SeqCst), policy.backoff().max_retries + 1);
        assert_eq!(sleeper.recorded().await.len(), 2);
    }

    #[tokio::test]
    async fn non_retryable_errors_propagate_immediately() {
        let (policy, sleeper) = policy(5);
        let calls = AtomicUsize::new(0);

        let result: Result<(), Scripted> = policy
            .run("download", classify, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(Scripted::Broken) }
            })
            .await;

        assert_eq!(result, Err(Scripted::Broken));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.recorded().await.is_empty());
    }
}
