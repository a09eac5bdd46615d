// src/forward/retry.rs
use crate::config::ForwardConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryStrategy {
    config: ForwardConfig,
}

#[derive(Debug)]
pub enum RetryDecision {
    Retry,
    NoRetry,
}

impl RetryStrategy {
    pub fn new(config: ForwardConfig) -> Self {
        Self { config }
    }

    /// Execute with custom retry decision logic
    pub async fn execute_with_decision<F, Fut, T, E>(
        &self,
        mut f: F,
        should_retry: impl Fn(&E) -> RetryDecision,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.config.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            match f().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    match should_retry(&error) {
                        RetryDecision::NoRetry => {
                            debug!("Error is non-retryable: {}", error);
                            return Err(error);
                        }
                        RetryDecision::Retry => {
                            if attempt >= max_attempts {
                                warn!(
                                    "Retry failed after {} attempts: {}",
                                    attempt, error
                                );
                                return Err(error);
                            }

                            let backoff = self.calculate_backoff(attempt);
                            debug!(
                                "Attempt {} failed: {}. Retrying in {:?}",
                                attempt, error, backoff
                            );

                            sleep(backoff).await;
                        }
                    }
                }
            }
        }
    }

    /// Calculate exponential backoff with jitter
    fn calculate_backoff(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base().as_millis() as u64;
        let max = self.config.backoff_max().as_millis() as u64;

        // Exponential backoff: base * 2^(attempt - 1)
        let exponential = base.saturating_mul(2u64.saturating_pow(attempt - 1));

        // Cap at maximum
        let capped = exponential.min(max);

        // Add jitter (0-25% of the calculated backoff)
        let jitter = (capped as f64 * rand::random::<f64>() * 0.25) as u64;

        Duration::from_millis(capped + jitter)
    }
}
