//! Bounded retry with exponential backoff for transient request failures.
//!
//! A transient error (timeout, network, rate limit, 5xx) is retried up to
//! `max_retries` times; anything else is returned on the first failure.

use crate::llm::{LlmClient, Prompt, RequestError};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based), capped at `max_backoff`
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
        let millis = (self.initial_backoff.as_millis() as f64 * factor)
            .min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }

    pub fn should_retry(&self, err: &RequestError, retries_done: u32) -> bool {
        err.is_transient() && retries_done < self.max_retries
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out
    pub async fn run<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let mut retries_done = 0;

        loop {
            match operation().await {
                Ok(value) => {
                    if retries_done > 0 {
                        tracing::info!(
                            operation = operation_name,
                            retries_done,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if self.should_retry(&err, retries_done) => {
                    let backoff = self.backoff_for(retries_done);
                    retries_done += 1;
                    tracing::warn!(
                        operation = operation_name,
                        retry = retries_done,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient request failure, will retry after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    tracing::error!(
                        operation = operation_name,
                        retries_done,
                        transient = err.is_transient(),
                        error = %err,
                        "Request failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}

/// Send a prompt through `client`, retrying transient failures per `policy`
pub async fn complete_with_retry(
    client: &dyn LlmClient,
    policy: &RetryPolicy,
    prompt: &Prompt,
) -> Result<String, RequestError> {
    let operation = prompt.kind.to_string();
    policy.run(&operation, || client.complete(prompt)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockLlmClient;
    use crate::llm::OperationKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::ZERO,
            multiplier: 2.0,
            max_backoff: Duration::ZERO,
        }
    }

    fn prompt() -> Prompt {
        Prompt::new(OperationKind::ExtractBusinessLogic, "system", "user")
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2.0,
            max_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff_for(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_transient_failure_retries_exactly_max_retries() {
        let mut client = MockLlmClient::new();
        // first attempt + 3 retries
        client
            .expect_complete()
            .times(4)
            .returning(|_| Err(RequestError::Timeout));

        let result = complete_with_retry(&client, &instant_policy(3), &prompt()).await;
        assert_eq!(result, Err(RequestError::Timeout));
    }

    #[tokio::test]
    async fn test_non_transient_failure_is_not_retried() {
        let mut client = MockLlmClient::new();
        client.expect_complete().times(1).returning(|_| {
            Err(RequestError::Authentication {
                status: 401,
                message: "invalid api key".to_string(),
            })
        });

        let result = complete_with_retry(&client, &instant_policy(3), &prompt()).await;
        assert!(matches!(result, Err(RequestError::Authentication { .. })));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = instant_policy(2)
            .run("test_op", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RequestError::RateLimited("429".to_string()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_policy() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::none()
            .run("test_op", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(RequestError::Network("reset".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
