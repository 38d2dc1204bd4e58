use assert_matches::assert_matches;
use pretty_assertions::assert_eq;

use crate::errors::ChainCallErrorKind;
use crate::test_utils::FakeLotteryContract;
use crate::{ChainCallError, ContractFunction, LotteryContractReader};

#[tokio::test]
async fn fake_contract_failures_run_out() {
    let contract = FakeLotteryContract::new();
    contract.set_current_round(8);
    contract.fail_times(ContractFunction::CurrentRoundId, None, ChainCallErrorKind::RateLimited, 2);

    assert!(contract.current_round_id().await.unwrap_err().is_rate_limited());
    assert!(contract.current_round_id().await.unwrap_err().is_rate_limited());
    assert_eq!(contract.current_round_id().await, Ok(8));
    assert_eq!(contract.total_calls(), 3);
}

#[tokio::test]
async fn unknown_round_reverts() {
    let contract = FakeLotteryContract::new();

    assert_matches!(contract.round_info(1).await, Err(ChainCallError::Permanent { .. }));
}
