use std::fs;
use std::io;

use lottery_base_layer::{Address, RoundId};
use lottery_leaderboard_types::errors::CacheStoreError;
use lottery_leaderboard_types::{LeaderboardEntry, LeaderboardRecord};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;
use tempfile::TempDir;
use tracing_test::traced_test;

use crate::config::{EvictionPolicy, ResultCacheConfig};
use crate::result_cache::{
    CachedRecords,
    FileResultCacheStore,
    InMemoryResultCacheStore,
    MockResultCacheStore,
    ResultCache,
    ResultCacheStore,
};

fn record(round: RoundId) -> LeaderboardRecord {
    LeaderboardRecord {
        data: vec![LeaderboardEntry {
            ticket_number: round * 10,
            rank: 1,
            owner: Address::repeat_byte(0x42),
            prize: "25.000000".to_owned(),
        }],
        round,
        timestamp: 1_700_000_000_000 + round,
    }
}

fn empty_record(round: RoundId) -> LeaderboardRecord {
    LeaderboardRecord { data: vec![], round, timestamp: 1_700_000_000_000 }
}

fn memory_cache(max_cache_size: usize, eviction_policy: EvictionPolicy) -> ResultCache {
    let config = ResultCacheConfig {
        max_cache_size: Some(max_cache_size),
        eviction_policy: Some(eviction_policy),
        ..Default::default()
    };
    ResultCache::new(config, Box::new(InMemoryResultCacheStore))
}

#[test]
fn insertion_order_evicts_the_first_inserted_rounds() {
    let mut cache = memory_cache(10, EvictionPolicy::InsertionOrder);

    for round in 1..=12 {
        cache.put(record(round));
    }

    assert_eq!(cache.len(), 10);
    assert_eq!(cache.get(1), None);
    assert_eq!(cache.get(2), None);
    assert_eq!(cache.rounds(), (3..=12).collect::<Vec<_>>());
}

#[test]
fn oldest_round_evicts_the_lowest_round_ids() {
    let mut cache = memory_cache(10, EvictionPolicy::OldestRound);

    for round in [7, 1, 12, 3, 9, 2, 11, 4, 10, 5, 8, 6] {
        cache.put(record(round));
    }

    let mut rounds = cache.rounds();
    rounds.sort();
    assert_eq!(rounds, (3..=12).collect::<Vec<_>>());
}

#[test]
fn empty_result_is_a_hit_not_a_miss() {
    let mut cache = memory_cache(10, EvictionPolicy::InsertionOrder);

    assert_eq!(cache.get(4), None);
    cache.put(empty_record(4));

    let cached = cache.get(4).unwrap();
    assert!(cached.is_empty());
}

#[test]
fn put_replaces_wholesale() {
    let mut cache = memory_cache(10, EvictionPolicy::InsertionOrder);
    cache.put(record(4));

    cache.put(empty_record(4));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(4), Some(empty_record(4)));
}

#[test]
fn evict_older_than_keeps_the_threshold_round() {
    let mut cache = memory_cache(10, EvictionPolicy::InsertionOrder);
    for round in 1..=6 {
        cache.put(record(round));
    }

    assert_eq!(cache.evict_older_than(4), 3);
    assert_eq!(cache.rounds(), vec![4, 5, 6]);
}

#[rstest]
#[case::within_trigger_distance(vec![1, 5, 9], 11, vec![1, 5, 9])]
#[case::beyond_trigger_distance(vec![1, 8, 12], 14, vec![12])]
#[case::everything_far_behind(vec![1, 2, 3], 30, vec![])]
#[case::empty_cache(vec![], 100, vec![])]
fn cleanup_distant_rounds(
    #[case] cached: Vec<RoundId>,
    #[case] requested: RoundId,
    #[case] expected: Vec<RoundId>,
) {
    let mut cache = memory_cache(10, EvictionPolicy::InsertionOrder);
    for round in cached {
        cache.put(record(round));
    }

    cache.cleanup_distant_rounds(requested);

    assert_eq!(cache.rounds(), expected);
}

#[test]
fn file_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("top_ranks_cache.json");
    let config = ResultCacheConfig::file(path.clone());

    let mut cache = ResultCache::from_config(config.clone());
    cache.put(record(5));
    cache.put(empty_record(6));
    drop(cache);

    let reloaded = ResultCache::from_config(config);
    assert_eq!(reloaded.get(5), Some(record(5)));
    assert_eq!(reloaded.get(6), Some(empty_record(6)));

    let on_disk: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk["5"]["round"], Value::from(5));
    assert!(on_disk["6"]["data"].as_array().unwrap().is_empty());
}

#[test]
fn file_store_prunes_oversized_file_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    let store = FileResultCacheStore::new(path.clone());
    let records: CachedRecords = (1..=40).map(|round| (round, record(round))).collect();
    store.save(&records).unwrap();

    let cache = ResultCache::from_config(ResultCacheConfig::file(path));

    assert_eq!(cache.len(), 30);
    assert_eq!(cache.get(10), None);
    assert_eq!(cache.get(11), Some(record(11)));
    assert_eq!(store.load().unwrap().len(), 30);
}

#[test]
#[traced_test]
fn corrupted_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    fs::write(&path, "{ not json").unwrap();

    let mut cache = ResultCache::from_config(ResultCacheConfig::file(path.clone()));

    assert!(cache.is_empty());
    assert!(logs_contain("Failed to load the leaderboard cache"));
    // The next write replaces the corrupted file.
    cache.put(record(2));
    assert_eq!(FileResultCacheStore::new(path).load().unwrap().len(), 1);
}

#[test]
#[traced_test]
fn save_failures_do_not_reach_callers() {
    let mut store = MockResultCacheStore::new();
    store.expect_load().returning(|| Ok(CachedRecords::new()));
    store.expect_save().times(1).returning(|_| {
        Err(CacheStoreError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "read-only")))
    });
    let mut cache = ResultCache::new(ResultCacheConfig::default(), Box::new(store));

    cache.put(record(3));

    assert_eq!(cache.get(3), Some(record(3)));
    assert!(logs_contain("Failed to persist the leaderboard cache"));
}
