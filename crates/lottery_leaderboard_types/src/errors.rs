use lottery_base_layer::{ChainCallError, RoundId};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LeaderboardError {
    #[error("roundId parameter is required")]
    MissingRoundId,
    #[error("Invalid roundId: {raw:?}")]
    InvalidRoundId { raw: String },
    #[error(transparent)]
    ChainCall(#[from] ChainCallError),
    #[error("Resolution of round {round_id} was aborted: {reason}")]
    ResolutionAborted { round_id: RoundId, reason: String },
}

/// Failures of a persistent cache backend. These are logged and never reach callers.
#[derive(Debug, Error)]
pub enum CacheStoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TicketDetailError {
    #[error("The draw of round {round_id} is not known to be executed")]
    DrawNotExecuted { round_id: RoundId },
    #[error(transparent)]
    ChainCall(#[from] ChainCallError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PrizeScannerError {
    #[error(transparent)]
    ChainCall(#[from] ChainCallError),
}
