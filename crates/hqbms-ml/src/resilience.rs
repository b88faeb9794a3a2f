//! Request deadlines and the retry-once-on-timeout policy for external calls

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};

use crate::error::{Error, Result};

/// End-to-end time budget shared by every external call of one request
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    /// Time left before the deadline (zero once passed)
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Effective limit for one call: the smaller of `per_call` and what is left
    pub fn limit(&self, per_call: Duration) -> Duration {
        per_call.min(self.remaining())
    }
}

/// Timeout and backoff applied to one kind of external call
#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    /// Limit for a single attempt
    pub per_call: Duration,
    /// Pause before the retry
    pub backoff: Duration,
}

impl CallPolicy {
    pub fn new(per_call: Duration, backoff: Duration) -> Self {
        Self { per_call, backoff }
    }
}

/// Run `operation` under the deadline, retrying once if it times out
///
/// Attempts are bounded by `policy.per_call` and by the time left on
/// `deadline`. Errors that are not timeouts are returned immediately. A second
/// timeout surfaces as [`Error::DependencyTimeout`].
pub async fn call_with_retry<F, Fut, T>(
    what: &str,
    deadline: &Deadline,
    policy: CallPolicy,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    const ATTEMPTS: u32 = 2;
    let mut last_failure = String::new();

    for attempt in 1..=ATTEMPTS {
        let budget = deadline.limit(policy.per_call);
        if budget.is_zero() {
            return Err(Error::DependencyTimeout(format!(
                "{}: request deadline exhausted",
                what
            )));
        }

        match timeout(budget, operation()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if !e.is_timeout() => return Err(e),
            Ok(Err(e)) => last_failure = e.to_string(),
            Err(_) => last_failure = format!("no response within {:?}", budget),
        }

        if attempt < ATTEMPTS {
            let pause = deadline.limit(policy.backoff);
            tracing::warn!(
                "{} timed out (attempt {}/{}), retrying in {:?}",
                what,
                attempt,
                ATTEMPTS,
                pause
            );
            sleep(pause).await;
        }
    }

    Err(Error::DependencyTimeout(format!("{}: {}", what, last_failure)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy() -> CallPolicy {
        CallPolicy::new(Duration::from_millis(20), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let value = call_with_retry("op", &deadline, policy(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(7)
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_retried_once_then_surfaces() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result: Result<()> = call_with_retry("slow op", &deadline, policy(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(500)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(Error::DependencyTimeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_timeout_then_success() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let value = call_with_retry("flaky op", &deadline, policy(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(Error::DependencyTimeout("first".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result: Result<()> = call_with_retry("bad op", &deadline, policy(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::embedding("model missing"))
        })
        .await;

        assert!(matches!(result, Err(Error::Embedding(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_deadline_short_circuits() {
        let deadline = Deadline::after(Duration::ZERO);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let result: Result<()> = call_with_retry("op", &deadline, policy(), move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(Error::DependencyTimeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
