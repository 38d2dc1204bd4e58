pub mod errors;

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
pub use lottery_base_layer::{Address, RoundId, TicketNumber, U256};
#[cfg(any(feature = "testing", test))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::errors::{LeaderboardError, PrizeScannerError};

#[cfg(test)]
#[path = "lib_test.rs"]
mod lib_test;

pub type LeaderboardResult<T> = Result<T, LeaderboardError>;
pub type PrizeScannerResult<T> = Result<T, PrizeScannerError>;
pub type SharedLotteryDataClient = Arc<dyn LotteryDataClient>;

/// Prize ranks are 1-based; 0 means the ticket did not win.
pub type Rank = u8;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

/// One winning ticket of a round.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub ticket_number: TicketNumber,
    pub rank: Rank,
    pub owner: Address,
    /// Display amount, e.g. "25.000000".
    pub prize: String,
}

/// The resolved leaderboard of a round. Replaced wholesale, never patched.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    /// Ascending by rank, ranks unique.
    pub data: Vec<LeaderboardEntry>,
    pub round: RoundId,
    pub timestamp: TimestampMs,
}

impl LeaderboardRecord {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Scan figures of a fresh resolution; not kept in the cache.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    pub total_checked: u64,
    pub found_ranks: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeaderboardOutcome {
    pub record: LeaderboardRecord,
    pub cached: bool,
    /// Only present when this call (or the in-flight call it joined) scanned the chain.
    pub stats: Option<ResolutionStats>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketDetailKind {
    Rank,
    Prize,
}

impl Display for TicketDetailKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TicketDetailKind::Rank => f.write_str("rank"),
            TicketDetailKind::Prize => f.write_str("prize"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketDetailValue {
    Rank(Rank),
    /// Base units.
    Prize(U256),
}

impl TicketDetailValue {
    pub fn kind(&self) -> TicketDetailKind {
        match self {
            TicketDetailValue::Rank(_) => TicketDetailKind::Rank,
            TicketDetailValue::Prize(_) => TicketDetailKind::Prize,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPrize {
    pub ticket_number: TicketNumber,
    pub rank: Rank,
    pub prize: String,
}

/// The prizes an account won in one round.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPrizes {
    pub round_id: RoundId,
    /// Number of tickets the account holds in the round, winning or not.
    pub user_tickets: usize,
    pub round_prizes: Vec<TicketPrize>,
    pub total_round_prize: String,
    pub is_already_claimed: bool,
    pub best_rank: Rank,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrizeSummary {
    pub found_prizes: bool,
    /// Sum of the prizes of rounds that were not claimed yet.
    pub total_pending_claims: String,
    /// Ascending by round.
    pub prizes: Vec<RoundPrizes>,
}

/// Serves the read side of the dashboard.
#[cfg_attr(any(feature = "testing", test), automock)]
#[async_trait]
pub trait LotteryDataClient: Send + Sync {
    async fn get_leaderboard(&self, round_id: RoundId) -> LeaderboardResult<LeaderboardOutcome>;

    async fn scan_prizes(&self, account: Address) -> PrizeScannerResult<PrizeSummary>;
}

/// Parses a raw `roundId` request parameter. Only positive integers are accepted.
pub fn parse_round_id(raw: Option<&str>) -> LeaderboardResult<RoundId> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(LeaderboardError::MissingRoundId),
    };
    match raw.trim().parse::<RoundId>() {
        Ok(round_id) if round_id > 0 => Ok(round_id),
        _ => Err(LeaderboardError::InvalidRoundId { raw: raw.to_owned() }),
    }
}
