use std::sync::Arc;
use std::time::Duration;

use lottery_base_layer::errors::ChainCallErrorKind;
use lottery_base_layer::test_utils::FakeLotteryContract;
use lottery_base_layer::{ContractFunction, LotteryContractReader};
use pretty_assertions::assert_eq;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

use crate::batch_executor::{BatchExecutor, BatchSchedule};

const ROUND: u64 = 3;

fn schedule(batch_size: usize, delay_ms: u64) -> BatchSchedule {
    BatchSchedule { batch_size, delay_between_batches: Duration::from_millis(delay_ms) }
}

#[tokio::test(start_paused = true)]
async fn results_stay_paired_with_their_items() {
    let executor = BatchExecutor::default();

    // Later items finish first.
    let outcome = executor
        .execute("double", (1..=6_u64).collect(), schedule(3, 10), |item| async move {
            tokio::time::sleep(Duration::from_millis(100 - item * 10)).await;
            Ok::<_, String>(item * 2)
        })
        .await;

    assert!(!outcome.cancelled);
    let pairs: Vec<_> =
        outcome.results.into_iter().map(|(item, result)| (item, result.unwrap())).collect();
    assert_eq!(pairs, vec![(1, 2), (2, 4), (3, 6), (4, 8), (5, 10), (6, 12)]);
}

#[tokio::test(start_paused = true)]
async fn chunks_run_concurrently_and_sequentially() {
    let contract = Arc::new(FakeLotteryContract::new());
    contract.set_latency(Duration::from_millis(100));
    let executor = BatchExecutor::default();
    let start = Instant::now();

    let outcome = executor
        .execute_with_retry("getTicketRank", (1..=12).collect(), schedule(5, 800), |ticket| {
            let contract = contract.clone();
            async move { contract.ticket_rank(ROUND, ticket).await }
        })
        .await;

    assert_eq!(outcome.results.len(), 12);
    assert_eq!(contract.max_concurrent_calls(), 5);
    // Three chunks of one call latency each, with two delays between them.
    assert_eq!(start.elapsed(), Duration::from_millis(3 * 100 + 2 * 800));
}

#[tokio::test(start_paused = true)]
async fn next_chunk_starts_after_previous_settled_and_delay() {
    let executor = BatchExecutor::default();
    let start = Instant::now();

    let outcome = executor
        .execute("record start", vec![1_u64, 2, 3, 4], schedule(2, 800), |item| async move {
            let started = start.elapsed();
            tokio::time::sleep(Duration::from_millis(50 * item)).await;
            Ok::<_, String>(started)
        })
        .await;

    let starts: Vec<_> = outcome.results.into_iter().map(|(_, result)| result.unwrap()).collect();
    // The first chunk settles when its slowest item (100ms) does.
    assert_eq!(starts[0], Duration::ZERO);
    assert_eq!(starts[1], Duration::ZERO);
    assert_eq!(starts[2], Duration::from_millis(900));
    assert_eq!(starts[3], Duration::from_millis(900));
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn failed_chunk_does_not_stop_the_scan() {
    let executor = BatchExecutor::default();

    let outcome = executor
        .execute("lookup", (1..=10_u64).collect(), schedule(5, 100), |item| async move {
            if item <= 5 { Err(format!("item {item} unavailable")) } else { Ok(item) }
        })
        .await;

    assert!(!outcome.cancelled);
    let succeeded: Vec<_> =
        outcome.results.iter().filter_map(|(_, result)| result.as_ref().ok()).copied().collect();
    assert_eq!(succeeded, vec![6, 7, 8, 9, 10]);
    assert!(logs_contain("lookup batch 1/2 failed entirely"));
}

#[tokio::test(start_paused = true)]
async fn each_call_is_retried() {
    let contract = Arc::new(FakeLotteryContract::new());
    contract.set_rank(ROUND, 3, 2);
    contract.fail_times(ContractFunction::GetTicketRank, Some(3), ChainCallErrorKind::Transient, 2);
    let executor = BatchExecutor::default();

    let outcome = executor
        .execute_with_retry("getTicketRank", (1..=5).collect(), schedule(5, 800), |ticket| {
            let contract = contract.clone();
            async move { contract.ticket_rank(ROUND, ticket).await }
        })
        .await;

    assert!(outcome.results.iter().all(|(_, result)| result.is_ok()));
    assert_eq!(outcome.results[2], (3, Ok(2)));
    assert_eq!(contract.call_count(ContractFunction::GetTicketRank), 7);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_between_chunks() {
    let token = CancellationToken::new();
    let executor = BatchExecutor::default().with_cancellation(token.clone());

    let outcome = executor
        .execute("cancel", (1..=10_u64).collect(), schedule(5, 800), |item| {
            let token = token.clone();
            async move {
                token.cancel();
                Ok::<_, String>(item)
            }
        })
        .await;

    assert!(outcome.cancelled);
    assert_eq!(outcome.results.len(), 5);
}

#[tokio::test]
async fn empty_input_is_a_no_op() {
    let executor = BatchExecutor::default();

    let outcome = executor
        .execute("nothing", Vec::<u64>::new(), schedule(5, 800), |item| async move {
            Ok::<_, String>(item)
        })
        .await;

    assert!(outcome.results.is_empty());
    assert!(!outcome.cancelled);
}
