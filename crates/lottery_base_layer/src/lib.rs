use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

pub use alloy::primitives::{Address, U256};
use async_trait::async_trait;
#[cfg(any(feature = "testing", test))]
use mockall::automock;

pub mod errors;
pub mod ethereum_lottery_contract;
pub(crate) mod metrics;
#[cfg(test)]
#[path = "lib_test.rs"]
mod lib_test;

#[cfg(any(feature = "testing", test))]
pub mod test_utils;

pub use errors::{ChainCallError, ChainCallResult};

pub type RoundId = u64;
pub type TicketNumber = u64;
pub type SharedLotteryContractReader = Arc<dyn LotteryContractReader>;

/// The view functions of the lottery contract this crate may call. Nothing else is ever sent to
/// the chain.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ContractFunction {
    GetTicketRank,
    GetTicketOwner,
    CalculateTicketPrize,
    CurrentRoundId,
    GetRoundInfo,
    IsClaimed,
    GetUserTickets,
}

impl ContractFunction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ContractFunction::GetTicketRank => "getTicketRank",
            ContractFunction::GetTicketOwner => "getTicketOwner",
            ContractFunction::CalculateTicketPrize => "calculateTicketPrize",
            ContractFunction::CurrentRoundId => "currentRoundId",
            ContractFunction::GetRoundInfo => "getRoundInfo",
            ContractFunction::IsClaimed => "isClaimed",
            ContractFunction::GetUserTickets => "getUserTickets",
        }
    }
}

impl Display for ContractFunction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round metadata as reported by `getRoundInfo`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RoundInfo {
    pub total_tickets: u64,
    /// In base units.
    pub ticket_price: U256,
    pub tickets_sold: u64,
    pub is_active: bool,
    pub draw_executed: bool,
    pub settled: bool,
    /// Unix seconds.
    pub created_at: u64,
}

/// Read-only interface of the lottery contract.
#[cfg_attr(any(feature = "testing", test), automock)]
#[async_trait]
pub trait LotteryContractReader: Send + Sync {
    /// The prize tier of a ticket; 0 means no prize (or no draw yet).
    async fn ticket_rank(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<u8>;

    /// The owner of a ticket; the zero address means the ticket was not sold.
    async fn ticket_owner(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<Address>;

    /// The prize of a ticket, in base units.
    async fn ticket_prize(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<U256>;

    async fn current_round_id(&self) -> ChainCallResult<RoundId>;

    async fn round_info(&self, round_id: RoundId) -> ChainCallResult<RoundInfo>;

    async fn is_claimed(&self, account: Address, round_id: RoundId) -> ChainCallResult<bool>;

    async fn user_tickets(
        &self,
        round_id: RoundId,
        account: Address,
    ) -> ChainCallResult<Vec<TicketNumber>>;
}
