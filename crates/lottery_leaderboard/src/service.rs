use std::sync::Arc;

use async_trait::async_trait;
use lottery_base_layer::{Address, RoundId};
use lottery_leaderboard_types::{
    LeaderboardOutcome,
    LeaderboardResult,
    LotteryDataClient,
    PrizeScannerResult,
    PrizeSummary,
};

use crate::leaderboard_provider::LeaderboardProvider;
use crate::prize_scanner::PrizeScanner;

#[cfg(test)]
#[path = "service_test.rs"]
mod service_test;

/// The read side of the dashboard: leaderboards and per-account prize summaries.
#[derive(Clone)]
pub struct LotteryDataService {
    provider: Arc<LeaderboardProvider>,
    scanner: Arc<PrizeScanner>,
}

impl LotteryDataService {
    pub fn new(provider: LeaderboardProvider, scanner: PrizeScanner) -> Self {
        Self { provider: Arc::new(provider), scanner: Arc::new(scanner) }
    }

    pub fn provider(&self) -> &LeaderboardProvider {
        &self.provider
    }
}

#[async_trait]
impl LotteryDataClient for LotteryDataService {
    async fn get_leaderboard(&self, round_id: RoundId) -> LeaderboardResult<LeaderboardOutcome> {
        self.provider.get_leaderboard(round_id).await
    }

    async fn scan_prizes(&self, account: Address) -> PrizeScannerResult<PrizeSummary> {
        self.scanner.scan_account(account).await
    }
}
