use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use lottery_base_layer::{ChainCallError, ChainCallResult};
use tracing::warn;

use crate::config::RetryConfig;
use crate::metrics::CONTRACT_CALL_RETRIES;

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;

/// How a failed attempt backs off.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureClass {
    RateLimited,
    Other,
}

impl FailureClass {
    pub fn of_chain_call(error: &ChainCallError) -> Self {
        if error.is_rate_limited() { FailureClass::RateLimited } else { FailureClass::Other }
    }

    fn as_label(&self) -> &'static str {
        match self {
            FailureClass::RateLimited => "rate_limited",
            FailureClass::Other => "other",
        }
    }
}

/// Retries a fallible async operation. After a rate limited attempt `a` (0-based) it sleeps
/// `min(rate_limit_base_delay * 2^a, max_backoff)`; after any other failure it sleeps
/// `retry_delay`. No sleep follows the last attempt.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn max_attempts(&self) -> usize {
        self.config.max_retries.saturating_add(1)
    }

    pub fn backoff(&self, attempt: usize, class: FailureClass) -> Duration {
        match class {
            FailureClass::Other => self.config.retry_delay,
            FailureClass::RateLimited => u32::try_from(attempt)
                .ok()
                .and_then(|attempt| 2_u32.checked_pow(attempt))
                .and_then(|factor| self.config.rate_limit_base_delay.checked_mul(factor))
                .map_or(self.config.max_backoff, |delay| delay.min(self.config.max_backoff)),
        }
    }

    pub async fn retry<T, E, F, Fut, C>(
        &self,
        operation_name: &str,
        mut operation: F,
        classify: C,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: Fn(&E) -> FailureClass,
        E: Display,
    {
        let last_attempt = self.config.max_retries;
        let mut attempt = 0;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if attempt >= last_attempt {
                return Err(error);
            }
            let class = classify(&error);
            let delay = self.backoff(attempt, class);
            warn!(
                "{operation_name} failed ({error}), retrying in {delay:?} (attempt {}/{})",
                attempt + 1,
                self.max_attempts()
            );
            CONTRACT_CALL_RETRIES.increment(1, &[("class", class.as_label())]);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// [`Self::retry`] for contract calls, backing off harder on rate limits.
    pub async fn retry_chain_call<T, F, Fut>(
        &self,
        operation_name: &str,
        operation: F,
    ) -> ChainCallResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ChainCallResult<T>>,
    {
        self.retry(operation_name, operation, FailureClass::of_chain_call).await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
