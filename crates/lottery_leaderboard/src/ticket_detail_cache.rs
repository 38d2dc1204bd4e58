//! Per-ticket rank and prize values, kept separately for every account being viewed.
//!
//! Values are only served for rounds whose draw is known to be executed, since a rank read before
//! the draw is meaningless. An account's values are dropped when its active round changes or when
//! the active round's draw flips to executed. Nothing done for one account touches another's state.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use indexmap::IndexMap;

use lottery_base_layer::{Address, RoundId, SharedLotteryContractReader, TicketNumber};
use lottery_leaderboard_types::errors::{CacheStoreError, TicketDetailError};
use lottery_leaderboard_types::{TicketDetailKind, TicketDetailValue};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::TicketDetailCacheConfig;
use crate::metrics::{TICKET_DETAIL_CACHE_HITS, TICKET_DETAIL_CACHE_MISSES};
use crate::retry::RetryPolicy;

#[cfg(test)]
#[path = "ticket_detail_cache_test.rs"]
mod ticket_detail_cache_test;

/// One persisted value of a (account, round) snapshot.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetailRecord {
    pub ticket_number: TicketNumber,
    pub value: TicketDetailValue,
}

#[cfg_attr(test, automock)]
pub trait TicketDetailStore: Send + Sync {
    /// `None` if nothing was saved for the pair.
    fn load(
        &self,
        account: Address,
        round_id: RoundId,
    ) -> Result<Option<Vec<TicketDetailRecord>>, CacheStoreError>;

    fn save(
        &self,
        account: Address,
        round_id: RoundId,
        records: &[TicketDetailRecord],
    ) -> Result<(), CacheStoreError>;

    /// Deletes all but the `retained` most recent rounds of `account`.
    fn retain_recent_rounds(
        &self,
        account: Address,
        retained: usize,
    ) -> Result<(), CacheStoreError>;
}

/// One JSON file per (account, round): `<storage_dir>/<account>/<round>.json`.
#[derive(Clone, Debug)]
pub struct FileTicketDetailStore {
    storage_dir: PathBuf,
}

impl FileTicketDetailStore {
    pub fn new(storage_dir: PathBuf) -> Self {
        Self { storage_dir }
    }

    fn account_dir(&self, account: Address) -> PathBuf {
        self.storage_dir.join(format!("{account:#x}"))
    }

    fn snapshot_path(&self, account: Address, round_id: RoundId) -> PathBuf {
        self.account_dir(account).join(format!("{round_id}.json"))
    }
}

impl TicketDetailStore for FileTicketDetailStore {
    fn load(
        &self,
        account: Address,
        round_id: RoundId,
    ) -> Result<Option<Vec<TicketDetailRecord>>, CacheStoreError> {
        let path = self.snapshot_path(account, round_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(
        &self,
        account: Address,
        round_id: RoundId,
        records: &[TicketDetailRecord],
    ) -> Result<(), CacheStoreError> {
        fs::create_dir_all(self.account_dir(account))?;
        fs::write(self.snapshot_path(account, round_id), serde_json::to_vec(records)?)?;
        Ok(())
    }

    fn retain_recent_rounds(
        &self,
        account: Address,
        retained: usize,
    ) -> Result<(), CacheStoreError> {
        let account_dir = self.account_dir(account);
        if !account_dir.exists() {
            return Ok(());
        }
        let mut rounds = Vec::new();
        for entry in fs::read_dir(&account_dir)? {
            let path = entry?.path();
            let round_id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<RoundId>().ok());
            if let Some(round_id) = round_id {
                rounds.push(round_id);
            }
        }
        rounds.sort_unstable_by(|a, b| b.cmp(a));
        for round_id in rounds.into_iter().skip(retained) {
            debug!("Deleting ticket details of account {account} round {round_id}");
            fs::remove_file(self.snapshot_path(account, round_id))?;
        }
        Ok(())
    }
}

type DetailKey = (RoundId, TicketNumber, TicketDetailKind);

#[derive(Debug, Default)]
struct AccountDetails {
    active_round: Option<RoundId>,
    // Draw execution is irreversible, so this survives a clear of the values.
    executed_rounds: HashSet<RoundId>,
    entries: HashMap<DetailKey, TicketDetailValue>,
    // Rounds whose persisted snapshot was already merged into `entries`.
    loaded_rounds: HashSet<RoundId>,
    // Bumped on every clear, so fetches that started before it are not stored.
    generation: u64,
}

impl AccountDetails {
    fn clear_values(&mut self) {
        self.entries.clear();
        self.loaded_rounds.clear();
        self.generation += 1;
    }
}

pub struct TicketDetailCache {
    reader: SharedLotteryContractReader,
    retry_policy: RetryPolicy,
    config: TicketDetailCacheConfig,
    store: Option<Box<dyn TicketDetailStore>>,
    // Least recently observed account first.
    accounts: Mutex<IndexMap<Address, AccountDetails>>,
}

impl TicketDetailCache {
    pub fn new(
        config: TicketDetailCacheConfig,
        reader: SharedLotteryContractReader,
        retry_policy: RetryPolicy,
        store: Option<Box<dyn TicketDetailStore>>,
    ) -> Self {
        Self { reader, retry_policy, config, store, accounts: Mutex::new(IndexMap::new()) }
    }

    /// A cache persisting to `config.storage_dir` if `config.persist` is set.
    pub fn from_config(
        config: TicketDetailCacheConfig,
        reader: SharedLotteryContractReader,
        retry_policy: RetryPolicy,
    ) -> Self {
        let store: Option<Box<dyn TicketDetailStore>> = if config.persist {
            Some(Box::new(FileTicketDetailStore::new(config.storage_dir.clone())))
        } else {
            None
        };
        Self::new(config, reader, retry_policy, store)
    }

    fn accounts(&self) -> MutexGuard<'_, IndexMap<Address, AccountDetails>> {
        // The state is left consistent at every unlock, so a poisoned lock is still usable.
        self.accounts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reports the active round as seen by `account`. Clears the account's values if its active
    /// round changed, or if the active round's draw just became executed. Beyond
    /// `max_tracked_accounts`, the least recently observed account is forgotten.
    pub fn observe(&self, account: Address, round_id: RoundId, draw_executed: bool) {
        let mut accounts = self.accounts();
        let mut details = accounts.shift_remove(&account).unwrap_or_default();
        let round_changed = details.active_round.is_some_and(|active| active != round_id);
        let draw_just_executed = draw_executed && !details.executed_rounds.contains(&round_id);
        if round_changed || (draw_just_executed && details.active_round.is_some()) {
            info!(
                "Clearing ticket details of account {account} (round changed: {round_changed}, \
                 draw executed: {draw_just_executed})"
            );
            details.clear_values();
        }
        details.active_round = Some(round_id);
        if draw_executed {
            details.executed_rounds.insert(round_id);
        }
        accounts.insert(account, details);

        while accounts.len() > self.config.max_tracked_accounts {
            if let Some((forgotten, _)) = accounts.shift_remove_index(0) {
                debug!("Forgetting ticket details of account {forgotten}");
            }
        }
    }

    /// Marks the draw of a past round as executed for `account`, allowing its values to be
    /// served. Does nothing for an account that was never observed.
    pub fn mark_draw_executed(&self, account: Address, round_id: RoundId) {
        if let Some(details) = self.accounts().get_mut(&account) {
            details.executed_rounds.insert(round_id);
        }
    }

    /// Drops the values of `round_id` for every account.
    pub fn invalidate_round(&self, round_id: RoundId) {
        for details in self.accounts().values_mut() {
            details.entries.retain(|(entry_round, _, _), _| *entry_round != round_id);
            details.loaded_rounds.remove(&round_id);
        }
        debug!("Invalidated ticket details of round {round_id}");
    }

    /// Drops everything cached for `account`.
    pub fn invalidate_account(&self, account: Address) {
        if self.accounts().shift_remove(&account).is_some() {
            debug!("Invalidated ticket details of account {account}");
        }
    }

    /// Number of values cached over all accounts.
    pub fn len(&self) -> usize {
        self.accounts().values().map(|details| details.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tracked_accounts(&self) -> usize {
        self.accounts().len()
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get_or_fetch(
        &self,
        account: Address,
        round_id: RoundId,
        ticket_number: TicketNumber,
        kind: TicketDetailKind,
    ) -> Result<TicketDetailValue, TicketDetailError> {
        let key = (round_id, ticket_number, kind);
        let generation = {
            let mut accounts = self.accounts();
            let Some(details) = accounts
                .get_mut(&account)
                .filter(|details| details.executed_rounds.contains(&round_id))
            else {
                return Err(TicketDetailError::DrawNotExecuted { round_id });
            };
            self.load_snapshot(account, details, round_id);
            if let Some(value) = details.entries.get(&key) {
                TICKET_DETAIL_CACHE_HITS.increment(1);
                return Ok(*value);
            }
            details.generation
        };

        TICKET_DETAIL_CACHE_MISSES.increment(1);
        let value = self.fetch(round_id, ticket_number, kind).await?;

        let mut accounts = self.accounts();
        match accounts.get_mut(&account) {
            Some(details) if details.generation == generation => {
                details.entries.insert(key, value);
                self.save_snapshot(account, details, round_id);
            }
            _ => debug!("Ticket details of {account} were cleared during the fetch of {key:?}"),
        }
        Ok(value)
    }

    async fn fetch(
        &self,
        round_id: RoundId,
        ticket_number: TicketNumber,
        kind: TicketDetailKind,
    ) -> Result<TicketDetailValue, TicketDetailError> {
        let reader = &self.reader;
        let value = match kind {
            TicketDetailKind::Rank => TicketDetailValue::Rank(
                self.retry_policy
                    .retry_chain_call("getTicketRank", || {
                        reader.ticket_rank(round_id, ticket_number)
                    })
                    .await?,
            ),
            TicketDetailKind::Prize => TicketDetailValue::Prize(
                self.retry_policy
                    .retry_chain_call("calculateTicketPrize", || {
                        reader.ticket_prize(round_id, ticket_number)
                    })
                    .await?,
            ),
        };
        Ok(value)
    }

    fn load_snapshot(&self, account: Address, details: &mut AccountDetails, round_id: RoundId) {
        let Some(store) = &self.store else {
            return;
        };
        if !details.loaded_rounds.insert(round_id) {
            return;
        }
        match store.load(account, round_id) {
            Ok(Some(records)) => {
                debug!("Loaded {} ticket details of round {round_id}", records.len());
                for record in records {
                    let key = (round_id, record.ticket_number, record.value.kind());
                    details.entries.insert(key, record.value);
                }
            }
            Ok(None) => {}
            Err(error) => warn!("Failed to load ticket details of round {round_id}: {error}"),
        }
    }

    fn save_snapshot(&self, account: Address, details: &AccountDetails, round_id: RoundId) {
        let Some(store) = &self.store else {
            return;
        };
        let mut records: Vec<_> = details
            .entries
            .iter()
            .filter(|((entry_round, _, _), _)| *entry_round == round_id)
            .map(|((_, ticket_number, _), value)| TicketDetailRecord {
                ticket_number: *ticket_number,
                value: *value,
            })
            .collect();
        records.sort_by_key(|record| {
            (record.ticket_number, record.value.kind() == TicketDetailKind::Prize)
        });
        let retained = self.config.retained_rounds_per_account;
        let result = store
            .save(account, round_id, &records)
            .and_then(|()| store.retain_recent_rounds(account, retained));
        if let Err(error) = result {
            warn!("Failed to persist ticket details of round {round_id}: {error}");
        }
    }
}
