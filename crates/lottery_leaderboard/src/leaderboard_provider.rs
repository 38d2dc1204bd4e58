use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use lottery_base_layer::RoundId;
use lottery_leaderboard_types::errors::LeaderboardError;
use lottery_leaderboard_types::{
    LeaderboardOutcome,
    LeaderboardRecord,
    LeaderboardResult,
    ResolutionStats,
};
use tracing::{debug, error, info, instrument};

use crate::metrics::{
    LEADERBOARD_CACHE_HITS,
    LEADERBOARD_CACHE_MISSES,
    LEADERBOARD_RESOLUTIONS_JOINED,
    LEADERBOARD_RESOLUTIONS_STARTED,
};
use crate::resolver::LeaderboardResolver;
use crate::result_cache::ResultCache;

#[cfg(test)]
#[path = "leaderboard_provider_test.rs"]
mod leaderboard_provider_test;

type Resolution = LeaderboardResult<(LeaderboardRecord, ResolutionStats)>;
type SharedResolution = Shared<BoxFuture<'static, Resolution>>;

/// Serves leaderboards from the result cache, resolving misses on chain. At most one resolution
/// per round is in flight; concurrent requests for the same round wait for it.
pub struct LeaderboardProvider {
    resolver: Arc<LeaderboardResolver>,
    cache: Arc<Mutex<ResultCache>>,
    in_flight: Arc<Mutex<HashMap<RoundId, SharedResolution>>>,
}

impl LeaderboardProvider {
    pub fn new(resolver: LeaderboardResolver, cache: ResultCache) -> Self {
        Self {
            resolver: Arc::new(resolver),
            cache: Arc::new(Mutex::new(cache)),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_leaderboard(
        &self,
        round_id: RoundId,
    ) -> LeaderboardResult<LeaderboardOutcome> {
        if round_id == 0 {
            return Err(LeaderboardError::InvalidRoundId { raw: round_id.to_string() });
        }

        {
            let mut cache = lock(&self.cache);
            cache.cleanup_distant_rounds(round_id);
            if let Some(record) = cache.get(round_id) {
                debug!("Leaderboard of round {round_id} served from cache");
                LEADERBOARD_CACHE_HITS.increment(1);
                return Ok(LeaderboardOutcome { record, cached: true, stats: None });
            }
        }
        LEADERBOARD_CACHE_MISSES.increment(1);

        let resolution = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(resolution) = in_flight.get(&round_id) {
                debug!("Joining in-flight resolution of round {round_id}");
                LEADERBOARD_RESOLUTIONS_JOINED.increment(1);
                resolution.clone()
            } else {
                // The previous resolution may have finished since the cache was checked.
                if let Some(record) = lock(&self.cache).get(round_id) {
                    LEADERBOARD_CACHE_HITS.increment(1);
                    return Ok(LeaderboardOutcome { record, cached: true, stats: None });
                }
                let resolution = self.spawn_resolution(round_id);
                in_flight.insert(round_id, resolution.clone());
                resolution
            }
        };

        let (record, stats) = resolution.await?;
        Ok(LeaderboardOutcome { record, cached: false, stats: Some(stats) })
    }

    /// Number of rounds currently being resolved.
    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    pub fn cached_rounds(&self) -> Vec<RoundId> {
        lock(&self.cache).rounds()
    }

    // The resolution runs on its own task so it completes even if every requester goes away.
    fn spawn_resolution(&self, round_id: RoundId) -> SharedResolution {
        info!("Resolving leaderboard of round {round_id}");
        LEADERBOARD_RESOLUTIONS_STARTED.increment(1);
        let resolver = self.resolver.clone();
        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();

        let handle = tokio::spawn(async move {
            let result = resolver.resolve(round_id).await;
            match &result {
                Ok((record, _)) => lock(&cache).put(record.clone()),
                Err(err) => error!("Failed to resolve leaderboard of round {round_id}: {err}"),
            }
            lock(&in_flight).remove(&round_id);
            result
        });

        handle
            .map(move |joined| {
                joined.unwrap_or_else(|join_error| {
                    Err(LeaderboardError::ResolutionAborted {
                        round_id,
                        reason: join_error.to_string(),
                    })
                })
            })
            .boxed()
            .shared()
    }
}

// Locks are never held across an await, and the guarded state stays consistent between
// statements, so a poisoned lock is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
