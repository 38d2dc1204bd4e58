//! Leaderboard resolution and caching over the lottery contract.
//!
//! Every chain read goes through a [`retry::RetryPolicy`] and, for scans over many tickets, a
//! [`batch_executor::BatchExecutor`] that spaces requests out to stay under the node's rate
//! limits. Resolved leaderboards are kept in a [`result_cache::ResultCache`].

pub mod batch_executor;
pub mod config;
pub mod leaderboard_provider;
pub(crate) mod metrics;
pub mod prize_format;
pub mod prize_scanner;
pub mod resolver;
pub mod result_cache;
pub mod retry;
pub mod service;
pub mod ticket_detail_cache;


use std::sync::Arc;

use lottery_base_layer::SharedLotteryContractReader;
use tokio_util::sync::CancellationToken;

use crate::batch_executor::BatchExecutor;
use crate::config::LeaderboardConfig;
use crate::leaderboard_provider::LeaderboardProvider;
use crate::prize_scanner::PrizeScanner;
use crate::resolver::LeaderboardResolver;
use crate::result_cache::ResultCache;
use crate::retry::RetryPolicy;
use crate::service::LotteryDataService;
use crate::ticket_detail_cache::TicketDetailCache;

/// Wires the leaderboard components over `reader`. Cancelling `cancellation` aborts resolutions
/// between batches.
pub fn create_lottery_data_service(
    config: &LeaderboardConfig,
    reader: SharedLotteryContractReader,
    cancellation: CancellationToken,
) -> LotteryDataService {
    metrics::register_metrics();
    let retry_policy = RetryPolicy::new(config.retry_config);
    let executor = BatchExecutor::new(retry_policy).with_cancellation(cancellation);

    let resolver = LeaderboardResolver::new(
        config.resolver_config.clone(),
        config.prize_display_config,
        reader.clone(),
        executor,
    );
    let result_cache = ResultCache::from_config(config.result_cache_config.clone());
    let provider = LeaderboardProvider::new(resolver, result_cache);

    let detail_cache = Arc::new(TicketDetailCache::from_config(
        config.ticket_detail_cache_config.clone(),
        reader.clone(),
        retry_policy,
    ));
    let scanner = PrizeScanner::new(
        config.prize_scanner_config,
        config.prize_display_config,
        reader,
        retry_policy,
        detail_cache,
    );
    LotteryDataService::new(provider, scanner)
}
