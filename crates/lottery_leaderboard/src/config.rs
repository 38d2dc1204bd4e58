use std::collections::BTreeMap;
use std::path::PathBuf;
use std::result;
use std::time::Duration;

use lottery_config::converters::{
    deserialize_milliseconds_to_duration,
    serialize_duration_as_milliseconds,
};
use lottery_config::dumping::{prepend_sub_config_name, ser_param, SerializeConfig};
use lottery_config::{ParamPath, ParamPrivacyInput, SerializedParam};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

const DEFAULT_MEMORY_CACHE_SIZE: usize = 10;
const DEFAULT_FILE_CACHE_SIZE: usize = 30;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
pub struct LeaderboardConfig {
    #[validate(nested)]
    pub retry_config: RetryConfig,
    #[validate(nested)]
    pub resolver_config: ResolverConfig,
    #[validate(nested)]
    pub result_cache_config: ResultCacheConfig,
    #[validate(nested)]
    pub ticket_detail_cache_config: TicketDetailCacheConfig,
    #[validate(nested)]
    pub prize_scanner_config: PrizeScannerConfig,
    #[validate(nested)]
    pub prize_display_config: PrizeDisplayConfig,
}

impl SerializeConfig for LeaderboardConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        let mut config = BTreeMap::new();
        config.extend(prepend_sub_config_name(self.retry_config.dump(), "retry_config"));
        config.extend(prepend_sub_config_name(self.resolver_config.dump(), "resolver_config"));
        config.extend(prepend_sub_config_name(
            self.result_cache_config.dump(),
            "result_cache_config",
        ));
        config.extend(prepend_sub_config_name(
            self.ticket_detail_cache_config.dump(),
            "ticket_detail_cache_config",
        ));
        config.extend(prepend_sub_config_name(
            self.prize_scanner_config.dump(),
            "prize_scanner_config",
        ));
        config.extend(prepend_sub_config_name(
            self.prize_display_config.dump(),
            "prize_display_config",
        ));
        config
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: usize,
    #[serde(
        deserialize_with = "deserialize_milliseconds_to_duration",
        serialize_with = "serialize_duration_as_milliseconds"
    )]
    pub rate_limit_base_delay: Duration,
    #[serde(
        deserialize_with = "deserialize_milliseconds_to_duration",
        serialize_with = "serialize_duration_as_milliseconds"
    )]
    pub max_backoff: Duration,
    /// Flat delay after a failure that is not a rate limit.
    #[serde(
        deserialize_with = "deserialize_milliseconds_to_duration",
        serialize_with = "serialize_duration_as_milliseconds"
    )]
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rate_limit_base_delay: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(10000),
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl SerializeConfig for RetryConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from([
            ser_param(
                "max_retries",
                &self.max_retries,
                "Number of retries of a failed contract call, after the first attempt.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "rate_limit_base_delay",
                &self.rate_limit_base_delay.as_millis(),
                "Backoff (milliseconds) after the first rate limited attempt. Doubles on every \
                 further rate limited attempt.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "max_backoff",
                &self.max_backoff.as_millis(),
                "Upper bound (milliseconds) of the rate limit backoff.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "retry_delay",
                &self.retry_delay.as_millis(),
                "Delay (milliseconds) after a failure that is not a rate limit.",
                ParamPrivacyInput::Public,
            ),
        ])
    }
}

/// Which tickets a rank scan covers.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanUniverse {
    /// Tickets `1..=ticketsSold` of the round, falling back to `default_tickets_sold`.
    TicketsSold,
    /// Always tickets `1..=default_tickets_sold`.
    Fixed,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct ResolverConfig {
    /// The number of prize tiers, K.
    #[validate(range(min = 1))]
    pub max_rank: u8,
    pub scan_universe: ScanUniverse,
    pub default_tickets_sold: u64,
    #[validate(range(min = 1))]
    pub rank_scan_batch_size: usize,
    #[serde(
        deserialize_with = "deserialize_milliseconds_to_duration",
        serialize_with = "serialize_duration_as_milliseconds"
    )]
    pub rank_scan_batch_delay: Duration,
    #[validate(range(min = 1))]
    pub detail_batch_size: usize,
    #[serde(
        deserialize_with = "deserialize_milliseconds_to_duration",
        serialize_with = "serialize_duration_as_milliseconds"
    )]
    pub detail_batch_delay: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_rank: 5,
            scan_universe: ScanUniverse::TicketsSold,
            default_tickets_sold: 100,
            rank_scan_batch_size: 5,
            rank_scan_batch_delay: Duration::from_millis(800),
            detail_batch_size: 1,
            detail_batch_delay: Duration::from_millis(500),
        }
    }
}

impl SerializeConfig for ResolverConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from([
            ser_param(
                "max_rank",
                &self.max_rank,
                "Number of prize ranks shown on the leaderboard.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "scan_universe",
                &self.scan_universe,
                "Which tickets to scan for ranks: 'tickets_sold' reads the number of sold tickets \
                 of the round, 'fixed' always scans default_tickets_sold tickets.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "default_tickets_sold",
                &self.default_tickets_sold,
                "Number of tickets to scan when the sold ticket count is unknown.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "rank_scan_batch_size",
                &self.rank_scan_batch_size,
                "Number of concurrent rank lookups per batch.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "rank_scan_batch_delay",
                &self.rank_scan_batch_delay.as_millis(),
                "Delay (milliseconds) between rank lookup batches.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "detail_batch_size",
                &self.detail_batch_size,
                "Number of winners whose owner and prize are fetched concurrently.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "detail_batch_delay",
                &self.detail_batch_delay.as_millis(),
                "Delay (milliseconds) between winner detail batches.",
                ParamPrivacyInput::Public,
            ),
        ])
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCacheBackend {
    Memory,
    File,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Drop the records that were inserted first.
    InsertionOrder,
    /// Drop the records of the numerically lowest rounds.
    OldestRound,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[validate(schema(function = "validate_result_cache_config"))]
pub struct ResultCacheConfig {
    pub backend: ResultCacheBackend,
    /// Only used by the file backend.
    pub file_path: PathBuf,
    /// Unset means the backend's default, see [`ResultCacheConfig::cache_size`].
    #[validate(range(min = 1))]
    pub max_cache_size: Option<usize>,
    /// Unset means the backend's default, see [`ResultCacheConfig::eviction`].
    pub eviction_policy: Option<EvictionPolicy>,
    pub cleanup_trigger_distance: u64,
    pub cleanup_keep_distance: u64,
}

impl ResultCacheConfig {
    /// The durable variant: a JSON file, keeping the newest rounds.
    pub fn file(file_path: PathBuf) -> Self {
        Self { backend: ResultCacheBackend::File, file_path, ..Default::default() }
    }

    pub fn cache_size(&self) -> usize {
        self.max_cache_size.unwrap_or(match self.backend {
            ResultCacheBackend::Memory => DEFAULT_MEMORY_CACHE_SIZE,
            ResultCacheBackend::File => DEFAULT_FILE_CACHE_SIZE,
        })
    }

    pub fn eviction(&self) -> EvictionPolicy {
        self.eviction_policy.unwrap_or(match self.backend {
            ResultCacheBackend::Memory => EvictionPolicy::InsertionOrder,
            ResultCacheBackend::File => EvictionPolicy::OldestRound,
        })
    }
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            backend: ResultCacheBackend::Memory,
            file_path: PathBuf::from("data/top_ranks_cache.json"),
            max_cache_size: None,
            eviction_policy: None,
            cleanup_trigger_distance: 10,
            cleanup_keep_distance: 5,
        }
    }
}

impl SerializeConfig for ResultCacheConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from([
            ser_param(
                "backend",
                &self.backend,
                "Where resolved leaderboards are kept: 'memory' or 'file'.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "file_path",
                &self.file_path,
                "Path of the JSON file of the file backend.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "max_cache_size",
                &self.max_cache_size,
                "Maximum number of rounds kept in the cache. Null means 10 for the memory backend \
                 and 30 for the file backend.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "eviction_policy",
                &self.eviction_policy,
                "Which rounds to drop when the cache is full: 'insertion_order' or 'oldest_round'. \
                 Null means 'insertion_order' for the memory backend and 'oldest_round' for the \
                 file backend.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "cleanup_trigger_distance",
                &self.cleanup_trigger_distance,
                "Cleanup runs when a requested round is more than this many rounds past the \
                 oldest cached round.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "cleanup_keep_distance",
                &self.cleanup_keep_distance,
                "Cleanup drops cached rounds more than this many rounds behind the requested one.",
                ParamPrivacyInput::Public,
            ),
        ])
    }
}

fn validate_result_cache_config(config: &ResultCacheConfig) -> result::Result<(), ValidationError> {
    if config.cleanup_keep_distance > config.cleanup_trigger_distance {
        return Err(ValidationError::new(
            "cleanup_keep_distance must not exceed cleanup_trigger_distance",
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct TicketDetailCacheConfig {
    pub persist: bool,
    pub storage_dir: PathBuf,
    #[validate(range(min = 1))]
    pub retained_rounds_per_account: usize,
    #[validate(range(min = 1))]
    pub max_tracked_accounts: usize,
}

impl Default for TicketDetailCacheConfig {
    fn default() -> Self {
        Self {
            persist: false,
            storage_dir: PathBuf::from("data/ticket_details"),
            retained_rounds_per_account: 3,
            max_tracked_accounts: 100,
        }
    }
}

impl SerializeConfig for TicketDetailCacheConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from([
            ser_param(
                "persist",
                &self.persist,
                "Whether ticket details are also written to disk, per account and round.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "storage_dir",
                &self.storage_dir,
                "Directory of the persisted ticket details.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "retained_rounds_per_account",
                &self.retained_rounds_per_account,
                "Number of most recent rounds whose ticket details are kept on disk per account.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "max_tracked_accounts",
                &self.max_tracked_accounts,
                "Number of accounts whose ticket details are kept in memory. The least recently \
                 viewed account is dropped first.",
                ParamPrivacyInput::Public,
            ),
        ])
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
pub struct PrizeScannerConfig {
    /// The current round counts as one of them.
    #[validate(range(min = 1))]
    pub lookback_rounds: u64,
}

impl Default for PrizeScannerConfig {
    fn default() -> Self {
        Self { lookback_rounds: 5 }
    }
}

impl SerializeConfig for PrizeScannerConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from([ser_param(
            "lookback_rounds",
            &self.lookback_rounds,
            "Number of most recent rounds, including the current one, checked for prizes.",
            ParamPrivacyInput::Public,
        )])
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[validate(schema(function = "validate_prize_display_config"))]
pub struct PrizeDisplayConfig {
    /// Decimals of the prize token on chain.
    pub token_decimals: u8,
    /// Fixed number of decimals in displayed prizes.
    pub prize_decimals: u8,
}

impl Default for PrizeDisplayConfig {
    fn default() -> Self {
        Self { token_decimals: 18, prize_decimals: 6 }
    }
}

impl SerializeConfig for PrizeDisplayConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from([
            ser_param(
                "token_decimals",
                &self.token_decimals,
                "Decimals of the prize token.",
                ParamPrivacyInput::Public,
            ),
            ser_param(
                "prize_decimals",
                &self.prize_decimals,
                "Number of decimals prizes are displayed with.",
                ParamPrivacyInput::Public,
            ),
        ])
    }
}

// 10^77 is the largest power of ten a U256 holds.
fn validate_prize_display_config(
    config: &PrizeDisplayConfig,
) -> result::Result<(), ValidationError> {
    if config.token_decimals > 77 || config.prize_decimals > 77 {
        return Err(ValidationError::new("token_decimals and prize_decimals must be at most 77"));
    }
    Ok(())
}
