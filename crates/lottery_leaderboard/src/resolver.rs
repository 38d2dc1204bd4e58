use std::time::{SystemTime, UNIX_EPOCH};

use lottery_base_layer::{
    Address,
    ChainCallError,
    RoundId,
    SharedLotteryContractReader,
    TicketNumber,
    U256,
};
use lottery_leaderboard_types::errors::LeaderboardError;
use lottery_leaderboard_types::{
    LeaderboardEntry,
    LeaderboardRecord,
    LeaderboardResult,
    Rank,
    ResolutionStats,
    TimestampMs,
};
use tracing::{info, instrument, warn};

use crate::batch_executor::{BatchExecutor, BatchSchedule};
use crate::config::{PrizeDisplayConfig, ResolverConfig, ScanUniverse};
use crate::metrics::LEADERBOARD_RANK_LOOKUPS;
use crate::prize_format::format_prize;

#[cfg(test)]
#[path = "resolver_test.rs"]
mod resolver_test;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct RankedTicket {
    ticket_number: TicketNumber,
    rank: Rank,
}

/// Finds the winners of a round on chain: scans ticket ranks, keeps ranks `1..=max_rank` and
/// fetches owner and prize of each winner.
pub struct LeaderboardResolver {
    reader: SharedLotteryContractReader,
    executor: BatchExecutor,
    config: ResolverConfig,
    prize_display: PrizeDisplayConfig,
}

impl LeaderboardResolver {
    pub fn new(
        config: ResolverConfig,
        prize_display: PrizeDisplayConfig,
        reader: SharedLotteryContractReader,
        executor: BatchExecutor,
    ) -> Self {
        Self { reader, executor, config, prize_display }
    }

    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        round_id: RoundId,
    ) -> LeaderboardResult<(LeaderboardRecord, ResolutionStats)> {
        let tickets_to_check = self.tickets_to_check(round_id).await;
        info!("Checking {tickets_to_check} tickets of round {round_id} for ranks");

        let ranked = self.find_ranked_tickets(round_id, tickets_to_check).await?;
        info!("Found {} ranked tickets in round {round_id}: {ranked:?}", ranked.len());
        let stats = ResolutionStats { total_checked: tickets_to_check, found_ranks: ranked.len() };

        let data = if ranked.is_empty() {
            Vec::new()
        } else {
            self.fetch_winner_details(round_id, ranked).await?
        };
        info!("Resolved {} leaderboard entries for round {round_id}", data.len());

        Ok((LeaderboardRecord { data, round: round_id, timestamp: now_ms() }, stats))
    }

    async fn tickets_to_check(&self, round_id: RoundId) -> u64 {
        let fallback = self.config.default_tickets_sold;
        if self.config.scan_universe == ScanUniverse::Fixed {
            return fallback;
        }
        let reader = &self.reader;
        match self
            .executor
            .retry_policy()
            .retry_chain_call("getRoundInfo", || reader.round_info(round_id))
            .await
        {
            Ok(info) => info.tickets_sold,
            Err(error) => {
                warn!(
                    "Failed to read tickets sold of round {round_id}, scanning {fallback} \
                     tickets: {error}"
                );
                fallback
            }
        }
    }

    async fn find_ranked_tickets(
        &self,
        round_id: RoundId,
        tickets_to_check: u64,
    ) -> LeaderboardResult<Vec<RankedTicket>> {
        let schedule = BatchSchedule {
            batch_size: self.config.rank_scan_batch_size,
            delay_between_batches: self.config.rank_scan_batch_delay,
        };
        let reader = &self.reader;
        let outcome = self
            .executor
            .execute_with_retry(
                "getTicketRank",
                (1..=tickets_to_check).collect(),
                schedule,
                |ticket_number| {
                    LEADERBOARD_RANK_LOOKUPS.increment(1);
                    reader.ticket_rank(round_id, ticket_number)
                },
            )
            .await;
        if outcome.cancelled {
            return Err(LeaderboardError::ResolutionAborted {
                round_id,
                reason: "cancelled during the rank scan".to_owned(),
            });
        }

        let max_rank = self.config.max_rank;
        let mut ranked: Vec<_> = outcome
            .results
            .into_iter()
            .map(|(ticket_number, result)| {
                // A failed lookup counts as unranked.
                RankedTicket { ticket_number, rank: result.unwrap_or_default() }
            })
            .filter(|ticket| (1..=max_rank).contains(&ticket.rank))
            .collect();
        // Stable, so scan order breaks ties.
        ranked.sort_by_key(|ticket| ticket.rank);
        ranked.truncate(usize::from(max_rank));
        Ok(ranked)
    }

    async fn fetch_winner_details(
        &self,
        round_id: RoundId,
        ranked: Vec<RankedTicket>,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        let schedule = BatchSchedule {
            batch_size: self.config.detail_batch_size,
            delay_between_batches: self.config.detail_batch_delay,
        };
        let outcome = self
            .executor
            .execute("fetch winner details", ranked, schedule, |ticket| {
                self.fetch_winner(round_id, ticket)
            })
            .await;
        if outcome.cancelled {
            return Err(LeaderboardError::ResolutionAborted {
                round_id,
                reason: "cancelled while fetching winner details".to_owned(),
            });
        }

        // Winners whose details could not be read are dropped.
        Ok(outcome.results.into_iter().filter_map(|(_, result)| result.ok()).collect())
    }

    async fn fetch_winner(
        &self,
        round_id: RoundId,
        ticket: RankedTicket,
    ) -> Result<LeaderboardEntry, ChainCallError> {
        let reader = &self.reader;
        let retry_policy = self.executor.retry_policy();
        let owner: Address = retry_policy
            .retry_chain_call("getTicketOwner", || {
                reader.ticket_owner(round_id, ticket.ticket_number)
            })
            .await?;
        let prize: U256 = retry_policy
            .retry_chain_call("calculateTicketPrize", || {
                reader.ticket_prize(round_id, ticket.ticket_number)
            })
            .await?;
        Ok(LeaderboardEntry {
            ticket_number: ticket.ticket_number,
            rank: ticket.rank,
            owner,
            prize: format_prize(prize, &self.prize_display),
        })
    }
}

pub(crate) fn now_ms() -> TimestampMs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}
