use std::sync::Arc;

use lottery_base_layer::{
    Address,
    ChainCallResult,
    RoundId,
    RoundInfo,
    SharedLotteryContractReader,
    TicketNumber,
    U256,
};
use lottery_leaderboard_types::errors::TicketDetailError;
use lottery_leaderboard_types::{
    PrizeScannerResult,
    PrizeSummary,
    Rank,
    RoundPrizes,
    TicketDetailKind,
    TicketDetailValue,
    TicketPrize,
};
use tracing::{debug, info, instrument, warn};

use crate::config::{PrizeDisplayConfig, PrizeScannerConfig};
use crate::prize_format::format_prize;
use crate::retry::RetryPolicy;
use crate::ticket_detail_cache::TicketDetailCache;

#[cfg(test)]
#[path = "prize_scanner_test.rs"]
mod prize_scanner_test;

/// Collects the prizes an account won over the most recent rounds.
pub struct PrizeScanner {
    reader: SharedLotteryContractReader,
    retry_policy: RetryPolicy,
    detail_cache: Arc<TicketDetailCache>,
    config: PrizeScannerConfig,
    prize_display: PrizeDisplayConfig,
}

impl PrizeScanner {
    pub fn new(
        config: PrizeScannerConfig,
        prize_display: PrizeDisplayConfig,
        reader: SharedLotteryContractReader,
        retry_policy: RetryPolicy,
        detail_cache: Arc<TicketDetailCache>,
    ) -> Self {
        Self { reader, retry_policy, detail_cache, config, prize_display }
    }

    /// Rounds that cannot be read are skipped; only a failure to read the current round fails the
    /// scan.
    #[instrument(skip(self))]
    pub async fn scan_account(&self, account: Address) -> PrizeScannerResult<PrizeSummary> {
        let reader = &self.reader;
        let current_round = self
            .retry_policy
            .retry_chain_call("currentRoundId", || reader.current_round_id())
            .await?;
        let first_round =
            current_round.saturating_sub(self.config.lookback_rounds.saturating_sub(1)).max(1);

        let current_info = self.round_info(current_round).await?;
        self.detail_cache.observe(account, current_round, current_info.draw_executed);

        let mut prizes = Vec::new();
        let mut total_pending = U256::ZERO;
        for round_id in first_round..=current_round {
            let info = if round_id == current_round {
                current_info
            } else {
                match self.round_info(round_id).await {
                    Ok(info) => info,
                    Err(error) => {
                        warn!("Could not check round {round_id} for prizes: {error}");
                        continue;
                    }
                }
            };
            if !info.draw_executed {
                debug!("Draw of round {round_id} not executed yet");
                continue;
            }
            self.detail_cache.mark_draw_executed(account, round_id);

            match self.scan_round(account, round_id).await {
                Ok(Some((round_prizes, total_round_prize))) => {
                    if !round_prizes.is_already_claimed {
                        total_pending = total_pending.saturating_add(total_round_prize);
                    }
                    prizes.push(round_prizes);
                }
                Ok(None) => {}
                Err(error) => warn!("Could not check round {round_id} for prizes: {error}"),
            }
        }

        info!("Account {account} won prizes in {} of the recent rounds", prizes.len());
        Ok(PrizeSummary {
            found_prizes: !prizes.is_empty(),
            total_pending_claims: format_prize(total_pending, &self.prize_display),
            prizes,
        })
    }

    async fn round_info(&self, round_id: RoundId) -> ChainCallResult<RoundInfo> {
        let reader = &self.reader;
        self.retry_policy.retry_chain_call("getRoundInfo", || reader.round_info(round_id)).await
    }

    // Returns `None` if the account won nothing in the round.
    async fn scan_round(
        &self,
        account: Address,
        round_id: RoundId,
    ) -> Result<Option<(RoundPrizes, U256)>, TicketDetailError> {
        let reader = &self.reader;
        let tickets = self
            .retry_policy
            .retry_chain_call("getUserTickets", || reader.user_tickets(round_id, account))
            .await?;

        let mut winning = Vec::new();
        for ticket_number in &tickets {
            match self.ticket_prize(account, round_id, *ticket_number).await {
                Ok(Some(prize)) => winning.push(prize),
                Ok(None) => {}
                Err(error) => {
                    warn!("Skipping ticket {ticket_number} of round {round_id}: {error}")
                }
            }
        }
        let Some(best_rank) = winning.iter().map(|(_, rank, _)| *rank).min() else {
            return Ok(None);
        };

        let is_already_claimed = self
            .retry_policy
            .retry_chain_call("isClaimed", || reader.is_claimed(account, round_id))
            .await?;
        let total_round_prize =
            winning.iter().fold(U256::ZERO, |total, (_, _, prize)| total.saturating_add(*prize));
        let round_prizes = winning
            .into_iter()
            .map(|(ticket_number, rank, prize)| TicketPrize {
                ticket_number,
                rank,
                prize: format_prize(prize, &self.prize_display),
            })
            .collect();

        Ok(Some((
            RoundPrizes {
                round_id,
                user_tickets: tickets.len(),
                round_prizes,
                total_round_prize: format_prize(total_round_prize, &self.prize_display),
                is_already_claimed,
                best_rank,
            },
            total_round_prize,
        )))
    }

    // `None` for a ticket without a prize rank.
    async fn ticket_prize(
        &self,
        account: Address,
        round_id: RoundId,
        ticket_number: TicketNumber,
    ) -> Result<Option<(TicketNumber, Rank, U256)>, TicketDetailError> {
        let cache = &self.detail_cache;
        let rank = match cache
            .get_or_fetch(account, round_id, ticket_number, TicketDetailKind::Rank)
            .await?
        {
            TicketDetailValue::Rank(rank) => rank,
            TicketDetailValue::Prize(_) => 0,
        };
        if rank == 0 {
            return Ok(None);
        }
        let prize = match cache
            .get_or_fetch(account, round_id, ticket_number, TicketDetailKind::Prize)
            .await?
        {
            TicketDetailValue::Prize(prize) => prize,
            TicketDetailValue::Rank(_) => U256::ZERO,
        };
        Ok(Some((ticket_number, rank, prize)))
    }
}
