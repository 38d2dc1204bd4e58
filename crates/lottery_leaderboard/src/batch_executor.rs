use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use lottery_base_layer::{ChainCallError, ChainCallResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::metrics::LEADERBOARD_FAILED_BATCHES;
use crate::retry::RetryPolicy;

#[cfg(test)]
#[path = "batch_executor_test.rs"]
mod batch_executor_test;

/// Chunking of a scan: `batch_size` items run concurrently, then the executor waits
/// `delay_between_batches` before the next chunk.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BatchSchedule {
    pub batch_size: usize,
    pub delay_between_batches: Duration,
}

/// The results of a scan, each paired with its item, in item order.
#[derive(Debug)]
pub struct BatchOutcome<I, T, E> {
    pub results: Vec<(I, Result<T, E>)>,
    /// Set when the scan was cancelled before all chunks ran. `results` then only covers the
    /// chunks that completed.
    pub cancelled: bool,
}

/// Runs many contract calls in rate-limit friendly chunks. A chunk never starts before the
/// previous one settled and the inter-chunk delay elapsed.
#[derive(Clone, Debug, Default)]
pub struct BatchExecutor {
    retry_policy: RetryPolicy,
    cancellation: Option<CancellationToken>,
}

impl BatchExecutor {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self { retry_policy, cancellation: None }
    }

    /// Stops scans between chunks once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Runs `processor` on every item, each call wrapped in the retry policy.
    pub async fn execute_with_retry<I, T, F, Fut>(
        &self,
        operation_name: &str,
        items: Vec<I>,
        schedule: BatchSchedule,
        processor: F,
    ) -> BatchOutcome<I, T, ChainCallError>
    where
        I: Clone + Debug,
        F: Fn(I) -> Fut,
        Fut: Future<Output = ChainCallResult<T>>,
    {
        let retry_policy = self.retry_policy;
        let processor = &processor;
        self.execute(operation_name, items, schedule, |item: I| async move {
            retry_policy.retry_chain_call(operation_name, || processor(item.clone())).await
        })
        .await
    }

    /// Runs `processor` on every item as is. Use when the processor retries on its own.
    pub async fn execute<I, T, E, F, Fut>(
        &self,
        operation_name: &str,
        items: Vec<I>,
        schedule: BatchSchedule,
        processor: F,
    ) -> BatchOutcome<I, T, E>
    where
        I: Clone + Debug,
        E: Display,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let batch_size = schedule.batch_size.max(1);
        let n_batches = items.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(items.len());

        for (batch_index, chunk) in items.chunks(batch_size).enumerate() {
            if self.is_cancelled() {
                warn!("{operation_name} cancelled after {batch_index}/{n_batches} batches");
                return BatchOutcome { results, cancelled: true };
            }

            let outcomes = join_all(chunk.iter().cloned().map(&processor)).await;
            let batch_results: Vec<_> = chunk.iter().cloned().zip(outcomes).collect();

            let mut n_failed = 0;
            for (item, result) in &batch_results {
                if let Err(error) = result {
                    n_failed += 1;
                    warn!("{operation_name} failed for {item:?}: {error}");
                }
            }
            if n_failed == batch_results.len() {
                LEADERBOARD_FAILED_BATCHES.increment(1);
                warn!(
                    "{operation_name} batch {}/{n_batches} failed entirely, continuing with the \
                     next batch",
                    batch_index + 1
                );
            } else {
                debug!("{operation_name} batch {}/{n_batches} done", batch_index + 1);
            }
            results.extend(batch_results);

            let is_last = batch_index + 1 == n_batches;
            if !is_last && !self.sleep_unless_cancelled(schedule.delay_between_batches).await {
                warn!("{operation_name} cancelled after {}/{n_batches} batches", batch_index + 1);
                return BatchOutcome { results, cancelled: true };
            }
        }

        BatchOutcome { results, cancelled: false }
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    // Returns false if the scan was cancelled while sleeping.
    async fn sleep_unless_cancelled(&self, delay: Duration) -> bool {
        let Some(token) = &self.cancellation else {
            tokio::time::sleep(delay).await;
            return true;
        };
        tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}
