//! Bounded retry with a fixed backoff schedule.

use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy: one initial attempt, then one retry per entry in `delays`,
/// waiting that long before it.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Schedule used by the recurring-transaction job: 5s, 30s, then 2min.
    pub fn recurring_default() -> Self {
        Self::new(vec![
            Duration::from_secs(5),
            Duration::from_secs(30),
            Duration::from_secs(120),
        ])
    }

    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Run `operation` until it succeeds or the schedule is exhausted.
    ///
    /// Returns the last error when every attempt failed.
    pub async fn run<F, Fut, T, E>(&self, name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(job = name, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => match self.delays.get(attempt - 1) {
                    Some(delay) => {
                        warn!(
                            job = name,
                            attempt,
                            max_attempts = self.max_attempts(),
                            retry_in_secs = delay.as_secs(),
                            error = %err,
                            "attempt failed, retrying"
                        );
                        sleep(*delay).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn instant_policy(retries: usize) -> RetryPolicy {
        RetryPolicy::new(vec![Duration::ZERO; retries])
    }

    #[test]
    fn default_schedule_is_three_retries() {
        let policy = RetryPolicy::recurring_default();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(
            policy.delays,
            vec![
                Duration::from_secs(5),
                Duration::from_secs(30),
                Duration::from_secs(120)
            ]
        );
    }

    #[tokio::test]
    async fn stops_after_first_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<&str, String> = instant_policy(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("done")
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<usize, String> = instant_policy(3)
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("fail {n}")) } else { Ok(n) }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_with_last_error() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), String> = instant_policy(3)
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("fail {n}"))
            })
            .await;
        assert_eq!(result.unwrap_err(), "fail 4");
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }
}
