//! Retry policy for upstream calls.

use crate::client::ClientError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Delay schedule between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    /// `base * 2^attempt` after attempt `attempt` (1-based) fails.
    Exponential { base: Duration },
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Exponential { base } => base.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

/// How many times to try, how long to wait in between, and how long each
/// attempt may take before it is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Token acquisition: 3 attempts, 2s then 4s apart, 15s each.
    pub const fn token() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                base: Duration::from_secs(1),
            },
            timeout: Duration::from_secs(15),
        }
    }

    /// States fetch: a single 10s attempt.
    pub const fn flights() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `operation` until it succeeds or attempts run out.
    ///
    /// The closure receives the 1-based attempt number. With a single-attempt
    /// policy the failure is returned unchanged; otherwise exhaustion yields
    /// [`ClientError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, ClientError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match timeout(self.timeout, operation(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout {
                    after: self.timeout,
                }),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if attempts == 1 {
                return Err(err);
            }

            if attempt >= attempts {
                tracing::error!(attempts, error = %err, "{} failed, giving up", label);
                return Err(ClientError::RetriesExhausted {
                    attempts,
                    last_error: err.to_string(),
                });
            }

            let delay = self.backoff.delay(attempt);
            tracing::warn!(
                attempt,
                max_attempts = attempts,
                error = %err,
                "{} failed, retrying in {:?}",
                label,
                delay
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::flights()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(policy: RetryPolicy) -> RetryPolicy {
        policy.with_backoff(Backoff::Exponential {
            base: Duration::from_millis(1),
        })
    }

    fn server_error() -> ClientError {
        ClientError::TokenRequest {
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[test]
    fn test_exponential_delays() {
        let backoff = RetryPolicy::token().backoff;
        assert_eq!(backoff.delay(1), Duration::from_secs(2));
        assert_eq!(backoff.delay(2), Duration::from_secs(4));
        assert_eq!(Backoff::None.delay(5), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);

        let result = fast(RetryPolicy::token())
            .run("token request", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(server_error())
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempt_count() {
        let calls = AtomicU32::new(0);

        let err = fast(RetryPolicy::token())
            .run("token request", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(server_error()) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
        let message = err.to_string();
        assert!(message.contains("3 attempts"), "{message}");
        assert!(message.contains("500"), "{message}");
    }

    #[tokio::test]
    async fn test_single_attempt_passes_error_through() {
        let err = RetryPolicy::flights()
            .run("flights request", |_| async { Err::<(), _>(server_error()) })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::TokenRequest { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_is_cancelled_after_timeout() {
        let err = RetryPolicy::flights()
            .run("flights request", |_| async {
                sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Timeout { after } if after == Duration::from_secs(10)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_attempts_time_out_after_fifteen_seconds() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let err = RetryPolicy::token()
            .run("token request", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
        let message = err.to_string();
        assert!(message.contains("timed out after 15s"), "{message}");

        // Three 15s attempts with 2s and 4s pauses in between.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(51), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(52), "{elapsed:?}");
    }
}
