use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use lottery_base_layer::errors::ChainCallErrorKind;
use lottery_base_layer::test_utils::FakeLotteryContract;
use lottery_base_layer::{Address, ContractFunction, U256};
use lottery_leaderboard_types::errors::TicketDetailError;
use lottery_leaderboard_types::{TicketDetailKind, TicketDetailValue};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::config::TicketDetailCacheConfig;
use crate::retry::RetryPolicy;
use crate::ticket_detail_cache::{
    FileTicketDetailStore,
    TicketDetailCache,
    TicketDetailRecord,
    TicketDetailStore,
};

const ALICE: Address = Address::repeat_byte(0xa1);
const BOB: Address = Address::repeat_byte(0xb0);
const CAROL: Address = Address::repeat_byte(0xc0);

fn contract_with_winner() -> Arc<FakeLotteryContract> {
    let contract = Arc::new(FakeLotteryContract::new());
    for round in 1..=6 {
        contract.set_ticket(round, 7, 2, ALICE, U256::from(round * 1000));
    }
    contract
}

fn memory_cache(contract: &Arc<FakeLotteryContract>) -> TicketDetailCache {
    TicketDetailCache::from_config(
        TicketDetailCacheConfig::default(),
        contract.clone(),
        RetryPolicy::default(),
    )
}

fn persistent_cache(contract: &Arc<FakeLotteryContract>, dir: &TempDir) -> TicketDetailCache {
    let config = TicketDetailCacheConfig {
        persist: true,
        storage_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    TicketDetailCache::from_config(config, contract.clone(), RetryPolicy::default())
}

fn limited_cache(
    contract: &Arc<FakeLotteryContract>,
    max_tracked_accounts: usize,
) -> TicketDetailCache {
    let config = TicketDetailCacheConfig { max_tracked_accounts, ..Default::default() };
    TicketDetailCache::from_config(config, contract.clone(), RetryPolicy::default())
}

#[tokio::test]
async fn refuses_rounds_whose_draw_is_not_executed() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);
    cache.observe(ALICE, 3, false);

    let result = cache.get_or_fetch(ALICE, 3, 7, TicketDetailKind::Rank).await;

    assert_eq!(result, Err(TicketDetailError::DrawNotExecuted { round_id: 3 }));
    assert_eq!(contract.total_calls(), 0);
}

#[tokio::test]
async fn refuses_accounts_never_observed() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);
    cache.observe(ALICE, 3, true);

    let result = cache.get_or_fetch(BOB, 3, 7, TicketDetailKind::Rank).await;

    assert_eq!(result, Err(TicketDetailError::DrawNotExecuted { round_id: 3 }));
    assert_eq!(contract.total_calls(), 0);
}

#[tokio::test]
async fn second_lookup_is_served_from_memory() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);
    cache.observe(ALICE, 3, true);

    let first = cache.get_or_fetch(ALICE, 3, 7, TicketDetailKind::Prize).await.unwrap();
    let second = cache.get_or_fetch(ALICE, 3, 7, TicketDetailKind::Prize).await.unwrap();

    assert_eq!(first, TicketDetailValue::Prize(U256::from(3000)));
    assert_eq!(second, first);
    assert_eq!(contract.call_count(ContractFunction::CalculateTicketPrize), 1);
}

#[tokio::test]
async fn accounts_are_cached_independently() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);
    cache.observe(ALICE, 3, true);
    cache.get_or_fetch(ALICE, 3, 7, TicketDetailKind::Rank).await.unwrap();

    cache.observe(BOB, 3, true);

    assert_eq!(cache.len(), 1);
    cache.get_or_fetch(ALICE, 3, 7, TicketDetailKind::Rank).await.unwrap();
    assert_eq!(contract.call_count(ContractFunction::GetTicketRank), 1);
    cache.get_or_fetch(BOB, 3, 7, TicketDetailKind::Rank).await.unwrap();
    assert_eq!(contract.call_count(ContractFunction::GetTicketRank), 2);
    assert_eq!(cache.tracked_accounts(), 2);
}

#[tokio::test]
async fn round_change_clears_only_that_account() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);
    for account in [ALICE, BOB] {
        cache.observe(account, 3, true);
        cache.get_or_fetch(account, 3, 7, TicketDetailKind::Rank).await.unwrap();
    }

    cache.observe(ALICE, 4, false);

    assert_eq!(cache.len(), 1);
    // Round 3 stays drawn, so it is served again after a fresh read.
    cache.get_or_fetch(ALICE, 3, 7, TicketDetailKind::Rank).await.unwrap();
    assert_eq!(contract.call_count(ContractFunction::GetTicketRank), 3);
}

#[tokio::test]
async fn draw_execution_clears_the_account() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);
    cache.observe(ALICE, 5, false);
    cache.mark_draw_executed(ALICE, 4);
    cache.get_or_fetch(ALICE, 4, 7, TicketDetailKind::Rank).await.unwrap();

    // Same round and draw state: nothing changes.
    cache.observe(ALICE, 5, false);
    assert_eq!(cache.len(), 1);

    cache.observe(ALICE, 5, true);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn marking_a_round_needs_an_observed_account() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);

    cache.mark_draw_executed(BOB, 4);

    assert_eq!(cache.tracked_accounts(), 0);
    assert_matches!(
        cache.get_or_fetch(BOB, 4, 7, TicketDetailKind::Rank).await,
        Err(TicketDetailError::DrawNotExecuted { round_id: 4 })
    );
}

#[tokio::test]
async fn invalidate_round_drops_that_round_for_every_account() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);
    for account in [ALICE, BOB] {
        cache.observe(account, 5, true);
        cache.mark_draw_executed(account, 4);
        cache.get_or_fetch(account, 4, 7, TicketDetailKind::Rank).await.unwrap();
    }
    cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Rank).await.unwrap();

    cache.invalidate_round(4);

    assert_eq!(cache.len(), 1);
    cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Rank).await.unwrap();
    assert_eq!(contract.call_count(ContractFunction::GetTicketRank), 3);
}

#[tokio::test]
async fn invalidate_account_keeps_other_accounts() {
    let contract = contract_with_winner();
    let cache = memory_cache(&contract);
    for account in [ALICE, BOB] {
        cache.observe(account, 5, true);
        cache.get_or_fetch(account, 5, 7, TicketDetailKind::Rank).await.unwrap();
    }

    cache.invalidate_account(ALICE);

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.tracked_accounts(), 1);
    assert_matches!(
        cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Rank).await,
        Err(TicketDetailError::DrawNotExecuted { round_id: 5 })
    );
}

#[tokio::test]
async fn least_recently_observed_account_is_forgotten() {
    let contract = contract_with_winner();
    let cache = limited_cache(&contract, 2);

    cache.observe(ALICE, 5, true);
    cache.observe(BOB, 5, true);
    cache.observe(ALICE, 5, true);
    cache.observe(CAROL, 5, true);

    assert_eq!(cache.tracked_accounts(), 2);
    cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Rank).await.unwrap();
    cache.get_or_fetch(CAROL, 5, 7, TicketDetailKind::Rank).await.unwrap();
    assert_matches!(
        cache.get_or_fetch(BOB, 5, 7, TicketDetailKind::Rank).await,
        Err(TicketDetailError::DrawNotExecuted { round_id: 5 })
    );
}

#[tokio::test(start_paused = true)]
async fn fetch_racing_a_clear_is_not_stored() {
    let contract = contract_with_winner();
    contract.set_latency(Duration::from_millis(100));
    let cache = memory_cache(&contract);
    cache.observe(ALICE, 5, true);

    let (value, ()) =
        tokio::join!(cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Rank), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.observe(ALICE, 6, true);
        });

    assert_eq!(value, Ok(TicketDetailValue::Rank(2)));
    assert!(cache.is_empty());
}

#[tokio::test(start_paused = true)]
async fn fetch_survives_another_account_being_observed() {
    let contract = contract_with_winner();
    contract.set_latency(Duration::from_millis(100));
    let cache = memory_cache(&contract);
    cache.observe(ALICE, 5, true);

    let (value, ()) =
        tokio::join!(cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Rank), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.observe(BOB, 6, true);
        });

    assert_eq!(value, Ok(TicketDetailValue::Rank(2)));
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn chain_failures_propagate_after_retries() {
    let contract = contract_with_winner();
    contract.fail_always(ContractFunction::GetTicketRank, None, ChainCallErrorKind::Transient);
    let cache = memory_cache(&contract);
    cache.observe(ALICE, 5, true);

    let result = cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Rank).await;

    assert_matches!(result, Err(TicketDetailError::ChainCall(_)));
    assert_eq!(contract.call_count(ContractFunction::GetTicketRank), 4);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn persisted_details_are_reused_after_restart() {
    let dir = TempDir::new().unwrap();
    let contract = contract_with_winner();
    let cache = persistent_cache(&contract, &dir);
    cache.observe(ALICE, 5, true);
    cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Rank).await.unwrap();
    cache.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Prize).await.unwrap();
    drop(cache);

    let restarted = persistent_cache(&contract, &dir);
    restarted.observe(ALICE, 5, true);
    let prize = restarted.get_or_fetch(ALICE, 5, 7, TicketDetailKind::Prize).await.unwrap();

    assert_eq!(prize, TicketDetailValue::Prize(U256::from(5000)));
    assert_eq!(contract.total_calls(), 2);
}

#[tokio::test]
async fn only_recent_rounds_are_kept_on_disk() {
    let dir = TempDir::new().unwrap();
    let contract = contract_with_winner();
    let cache = persistent_cache(&contract, &dir);
    cache.observe(ALICE, 6, true);
    for round in 1..=5 {
        cache.mark_draw_executed(ALICE, round);
    }

    for round in 1..=6 {
        cache.get_or_fetch(ALICE, round, 7, TicketDetailKind::Rank).await.unwrap();
    }

    let store = FileTicketDetailStore::new(dir.path().to_path_buf());
    for round in 1..=3 {
        assert_eq!(store.load(ALICE, round).unwrap(), None, "round {round}");
    }
    assert_eq!(
        store.load(ALICE, 6).unwrap(),
        Some(vec![TicketDetailRecord { ticket_number: 7, value: TicketDetailValue::Rank(2) }])
    );
}
