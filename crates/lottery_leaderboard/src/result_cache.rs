//! Resolved leaderboards, keyed by round.
//!
//! The cache itself always lives in memory; a [`ResultCacheStore`] decides whether it survives a
//! restart. Store failures are logged and otherwise ignored: a failed load starts from an empty
//! cache and a failed save leaves the in-memory state authoritative.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use lottery_base_layer::RoundId;
use lottery_leaderboard_types::errors::CacheStoreError;
use lottery_leaderboard_types::LeaderboardRecord;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info, warn};

use crate::config::{EvictionPolicy, ResultCacheBackend, ResultCacheConfig};

#[cfg(test)]
#[path = "result_cache_test.rs"]
mod result_cache_test;

/// Records in insertion order.
pub type CachedRecords = IndexMap<RoundId, LeaderboardRecord>;

#[cfg_attr(test, automock)]
pub trait ResultCacheStore: Send {
    fn load(&self) -> Result<CachedRecords, CacheStoreError>;

    /// Replaces everything previously saved.
    fn save(&self, records: &CachedRecords) -> Result<(), CacheStoreError>;
}

/// Keeps nothing across restarts.
#[derive(Clone, Copy, Debug, Default)]
pub struct InMemoryResultCacheStore;

impl ResultCacheStore for InMemoryResultCacheStore {
    fn load(&self) -> Result<CachedRecords, CacheStoreError> {
        Ok(CachedRecords::new())
    }

    fn save(&self, _records: &CachedRecords) -> Result<(), CacheStoreError> {
        Ok(())
    }
}

/// A single JSON object mapping round ids (as strings) to records, rewritten on every save.
#[derive(Clone, Debug)]
pub struct FileResultCacheStore {
    path: PathBuf,
}

impl FileResultCacheStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultCacheStore for FileResultCacheStore {
    fn load(&self) -> Result<CachedRecords, CacheStoreError> {
        if !self.path.exists() {
            debug!("No leaderboard cache file at {}", self.path.display());
            return Ok(CachedRecords::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let by_key: IndexMap<String, LeaderboardRecord> = serde_json::from_str(&contents)?;
        let mut records = CachedRecords::with_capacity(by_key.len());
        for (key, record) in by_key {
            match key.parse::<RoundId>() {
                Ok(round_id) => {
                    records.insert(round_id, record);
                }
                Err(_) => warn!("Skipping leaderboard cache entry with invalid round key {key:?}"),
            }
        }
        Ok(records)
    }

    fn save(&self, records: &CachedRecords) -> Result<(), CacheStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let by_key: IndexMap<String, &LeaderboardRecord> =
            records.iter().map(|(round_id, record)| (round_id.to_string(), record)).collect();
        let serialized = serde_json::to_vec_pretty(&by_key)?;

        // Write aside and rename so a crash never leaves a truncated file behind.
        let tmp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(&serialized)?;
        file.sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

pub struct ResultCache {
    config: ResultCacheConfig,
    store: Box<dyn ResultCacheStore>,
    records: CachedRecords,
}

impl ResultCache {
    pub fn new(config: ResultCacheConfig, store: Box<dyn ResultCacheStore>) -> Self {
        let records = store.load().unwrap_or_else(|error| {
            warn!("Failed to load the leaderboard cache, starting empty: {error}");
            CachedRecords::new()
        });
        info!("Leaderboard cache starts with {} rounds", records.len());
        let mut cache = Self { config, store, records };
        if cache.prune() > 0 {
            cache.persist();
        }
        cache
    }

    /// A cache with the store selected by `config.backend`.
    pub fn from_config(config: ResultCacheConfig) -> Self {
        let store: Box<dyn ResultCacheStore> = match config.backend {
            ResultCacheBackend::Memory => Box::new(InMemoryResultCacheStore),
            ResultCacheBackend::File => {
                Box::new(FileResultCacheStore::new(config.file_path.clone()))
            }
        };
        Self::new(config, store)
    }

    pub fn get(&self, round_id: RoundId) -> Option<LeaderboardRecord> {
        self.records.get(&round_id).cloned()
    }

    /// Stores `record` under its round, replacing any previous record, then evicts down to
    /// the configured cache size.
    pub fn put(&mut self, record: LeaderboardRecord) {
        self.records.insert(record.round, record);
        self.prune();
        self.persist();
    }

    /// Evicts every round below `threshold`. Returns the number of evicted rounds.
    pub fn evict_older_than(&mut self, threshold: RoundId) -> usize {
        let len_before = self.records.len();
        self.records.retain(|round_id, _| *round_id >= threshold);
        let evicted = len_before - self.records.len();
        if evicted > 0 {
            debug!("Evicted {evicted} leaderboard rounds older than {threshold}");
            self.persist();
        }
        evicted
    }

    /// When `requested` is far ahead of the oldest cached round, drops the rounds that are more
    /// than `cleanup_keep_distance` behind it. Returns the number of evicted rounds.
    pub fn cleanup_distant_rounds(&mut self, requested: RoundId) -> usize {
        let Some(oldest) = self.records.keys().min().copied() else {
            return 0;
        };
        if requested.saturating_sub(oldest) <= self.config.cleanup_trigger_distance {
            return 0;
        }
        self.evict_older_than(requested.saturating_sub(self.config.cleanup_keep_distance))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cached rounds in insertion order.
    pub fn rounds(&self) -> Vec<RoundId> {
        self.records.keys().copied().collect()
    }

    fn prune(&mut self) -> usize {
        let mut evicted = 0;
        while self.records.len() > self.config.cache_size() {
            let victim = match self.config.eviction() {
                EvictionPolicy::InsertionOrder => self.records.keys().next().copied(),
                EvictionPolicy::OldestRound => self.records.keys().min().copied(),
            };
            let Some(victim) = victim else {
                break;
            };
            self.records.shift_remove(&victim);
            evicted += 1;
        }
        if evicted > 0 {
            debug!("Pruned {evicted} leaderboard rounds");
        }
        evicted
    }

    fn persist(&self) {
        if let Err(error) = self.store.save(&self.records) {
            warn!("Failed to persist the leaderboard cache: {error}");
        }
    }
}
