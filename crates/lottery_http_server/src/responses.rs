//! JSON bodies of the HTTP endpoints. Field names follow the dashboard's camelCase convention.

use lottery_leaderboard_types::{
    LeaderboardEntry,
    LeaderboardOutcome,
    PrizeSummary,
    RoundId,
    TimestampMs,
};
use serde::{Deserialize, Serialize};

pub const NO_RANKED_TICKETS_MESSAGE: &str = "No ranked tickets found for this round";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRanksResponse {
    pub success: bool,
    pub data: Vec<LeaderboardEntry>,
    pub round: RoundId,
    pub timestamp: TimestampMs,
    pub cached: bool,
    /// Only reported for freshly resolved leaderboards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_checked: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_ranks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<LeaderboardOutcome> for TopRanksResponse {
    fn from(outcome: LeaderboardOutcome) -> Self {
        let LeaderboardOutcome { record, cached, stats } = outcome;
        let message = record.is_empty().then(|| NO_RANKED_TICKETS_MESSAGE.to_owned());
        Self {
            success: true,
            data: record.data,
            round: record.round,
            timestamp: record.timestamp,
            cached,
            total_checked: stats.map(|stats| stats.total_checked),
            found_ranks: stats.map(|stats| stats.found_ranks),
            message,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PrizesResponse {
    pub success: bool,
    pub data: PrizeSummary,
}

impl From<PrizeSummary> for PrizesResponse {
    fn from(data: PrizeSummary) -> Self {
        Self { success: true, data }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self { success: false, error: error.into(), details }
    }
}
