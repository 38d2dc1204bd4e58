use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;

use crate::errors::ChainCallErrorKind;
use crate::{
    ChainCallError,
    ChainCallResult,
    ContractFunction,
    LotteryContractReader,
    RoundId,
    RoundInfo,
    TicketNumber,
};

#[derive(Clone, Copy, Debug)]
struct ScriptedFailure {
    kind: ChainCallErrorKind,
    // `None` fails forever.
    remaining: Option<usize>,
}

#[derive(Default)]
struct FakeState {
    current_round_id: RoundId,
    rounds: HashMap<RoundId, RoundInfo>,
    ranks: HashMap<(RoundId, TicketNumber), u8>,
    owners: HashMap<(RoundId, TicketNumber), Address>,
    prizes: HashMap<(RoundId, TicketNumber), U256>,
    claimed: HashSet<(Address, RoundId)>,
    user_tickets: HashMap<(RoundId, Address), Vec<TicketNumber>>,
    failures: HashMap<(ContractFunction, Option<TicketNumber>), ScriptedFailure>,
    calls: HashMap<ContractFunction, usize>,
    latency: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

/// An in-memory lottery contract. Unknown tickets are unsold and unranked, unknown rounds revert.
/// Failures can be scripted per function, optionally narrowed to one ticket.
#[derive(Default)]
pub struct FakeLotteryContract {
    state: Mutex<FakeState>,
}

impl FakeLotteryContract {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake contract state poisoned")
    }

    pub fn set_current_round(&self, round_id: RoundId) {
        self.state().current_round_id = round_id;
    }

    pub fn set_round_info(&self, round_id: RoundId, info: RoundInfo) {
        self.state().rounds.insert(round_id, info);
    }

    /// A finished round with `tickets_sold` tickets.
    pub fn set_drawn_round(&self, round_id: RoundId, tickets_sold: u64) {
        self.set_round_info(
            round_id,
            RoundInfo {
                total_tickets: tickets_sold,
                tickets_sold,
                draw_executed: true,
                settled: true,
                ..Default::default()
            },
        );
    }

    pub fn set_rank(&self, round_id: RoundId, ticket_number: TicketNumber, rank: u8) {
        self.state().ranks.insert((round_id, ticket_number), rank);
    }

    pub fn set_ticket(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
        rank: u8,
        owner: Address,
        prize: U256,
    ) {
        let mut state = self.state();
        state.ranks.insert((round_id, ticket_number), rank);
        state.owners.insert((round_id, ticket_number), owner);
        state.prizes.insert((round_id, ticket_number), prize);
    }

    pub fn set_user_tickets(
        &self,
        round_id: RoundId,
        account: Address,
        tickets: Vec<TicketNumber>,
    ) {
        self.state().user_tickets.insert((round_id, account), tickets);
    }

    pub fn set_claimed(&self, account: Address, round_id: RoundId) {
        self.state().claimed.insert((account, round_id));
    }

    /// Every call to `function` (for `ticket_number`, if given) fails with `kind`.
    pub fn fail_always(
        &self,
        function: ContractFunction,
        ticket_number: Option<TicketNumber>,
        kind: ChainCallErrorKind,
    ) {
        self.state()
            .failures
            .insert((function, ticket_number), ScriptedFailure { kind, remaining: None });
    }

    /// The next `times` calls to `function` (for `ticket_number`, if given) fail with `kind`.
    pub fn fail_times(
        &self,
        function: ContractFunction,
        ticket_number: Option<TicketNumber>,
        kind: ChainCallErrorKind,
        times: usize,
    ) {
        self.state()
            .failures
            .insert((function, ticket_number), ScriptedFailure { kind, remaining: Some(times) });
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    pub fn call_count(&self, function: ContractFunction) -> usize {
        self.state().calls.get(&function).copied().unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// The largest number of calls that were in flight at the same time.
    pub fn max_concurrent_calls(&self) -> usize {
        self.state().max_in_flight
    }

    async fn begin_call(
        &self,
        function: ContractFunction,
        ticket_number: Option<TicketNumber>,
    ) -> ChainCallResult<()> {
        let latency = {
            let mut state = self.state();
            *state.calls.entry(function).or_default() += 1;
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state();
        state.in_flight -= 1;
        let key = [(function, ticket_number), (function, None)]
            .into_iter()
            .find(|key| state.failures.contains_key(key));
        let Some(key) = key else {
            return Ok(());
        };
        let Some(failure) = state.failures.get_mut(&key) else {
            return Ok(());
        };
        match &mut failure.remaining {
            Some(0) => return Ok(()),
            Some(remaining) => *remaining -= 1,
            None => {}
        }
        let message = "scripted failure".to_owned();
        Err(match failure.kind {
            ChainCallErrorKind::RateLimited => ChainCallError::RateLimited { function, message },
            ChainCallErrorKind::Transient => ChainCallError::Transient { function, message },
            ChainCallErrorKind::Permanent => ChainCallError::Permanent { function, message },
        })
    }
}

#[async_trait]
impl LotteryContractReader for FakeLotteryContract {
    async fn ticket_rank(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<u8> {
        self.begin_call(ContractFunction::GetTicketRank, Some(ticket_number)).await?;
        Ok(self.state().ranks.get(&(round_id, ticket_number)).copied().unwrap_or_default())
    }

    async fn ticket_owner(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<Address> {
        self.begin_call(ContractFunction::GetTicketOwner, Some(ticket_number)).await?;
        Ok(self.state().owners.get(&(round_id, ticket_number)).copied().unwrap_or_default())
    }

    async fn ticket_prize(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> ChainCallResult<U256> {
        self.begin_call(ContractFunction::CalculateTicketPrize, Some(ticket_number)).await?;
        Ok(self.state().prizes.get(&(round_id, ticket_number)).copied().unwrap_or_default())
    }

    async fn current_round_id(&self) -> ChainCallResult<RoundId> {
        self.begin_call(ContractFunction::CurrentRoundId, None).await?;
        Ok(self.state().current_round_id)
    }

    async fn round_info(&self, round_id: RoundId) -> ChainCallResult<RoundInfo> {
        let function = ContractFunction::GetRoundInfo;
        self.begin_call(function, None).await?;
        self.state().rounds.get(&round_id).copied().ok_or_else(|| ChainCallError::Permanent {
            function,
            message: format!("execution reverted: round {round_id} does not exist"),
        })
    }

    async fn is_claimed(&self, account: Address, round_id: RoundId) -> ChainCallResult<bool> {
        self.begin_call(ContractFunction::IsClaimed, None).await?;
        Ok(self.state().claimed.contains(&(account, round_id)))
    }

    async fn user_tickets(
        &self,
        round_id: RoundId,
        account: Address,
    ) -> ChainCallResult<Vec<TicketNumber>> {
        self.begin_call(ContractFunction::GetUserTickets, None).await?;
        Ok(self.state().user_tickets.get(&(round_id, account)).cloned().unwrap_or_default())
    }
}
