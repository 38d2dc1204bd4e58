use std::sync::Arc;

use lottery_base_layer::test_utils::FakeLotteryContract;
use lottery_base_layer::{Address, RoundInfo, U256};
use lottery_leaderboard_types::SharedLotteryDataClient;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use crate::config::LeaderboardConfig;
use crate::create_lottery_data_service;

fn client(contract: &Arc<FakeLotteryContract>) -> SharedLotteryDataClient {
    Arc::new(create_lottery_data_service(
        &LeaderboardConfig::default(),
        contract.clone(),
        CancellationToken::new(),
    ))
}

#[tokio::test(start_paused = true)]
async fn serves_leaderboards_through_the_cache() {
    let contract = Arc::new(FakeLotteryContract::new());
    contract.set_drawn_round(3, 6);
    contract.set_ticket(3, 2, 1, Address::repeat_byte(0x01), U256::from(7_000_000_u64));
    let client = client(&contract);

    let first = client.get_leaderboard(3).await.unwrap();
    let second = client.get_leaderboard(3).await.unwrap();

    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(first.record.data.len(), 1);
    assert_eq!(first.record.data[0].prize, "0.000000");
}

#[tokio::test(start_paused = true)]
async fn scans_prizes_of_an_account() {
    let account = Address::repeat_byte(0x02);
    let contract = Arc::new(FakeLotteryContract::new());
    contract.set_current_round(4);
    contract.set_round_info(4, RoundInfo::default());
    contract.set_drawn_round(3, 10);
    contract.set_user_tickets(3, account, vec![8]);
    contract.set_ticket(3, 8, 2, account, U256::from(3_500_000_000_000_000_000_u64));
    let client = client(&contract);

    let summary = client.scan_prizes(account).await.unwrap();

    assert!(summary.found_prizes);
    assert_eq!(summary.total_pending_claims, "3.500000");
    assert_eq!(summary.prizes[0].round_id, 3);
}
