use lottery_infra_utils::metrics::{LabeledMetricCounter, MetricCounter};
use tracing::info;

pub(crate) const LEADERBOARD_CACHE_HITS: MetricCounter =
    MetricCounter::new("leaderboard_cache_hits", "Leaderboard requests served from the cache", 0);

pub(crate) const LEADERBOARD_CACHE_MISSES: MetricCounter = MetricCounter::new(
    "leaderboard_cache_misses",
    "Leaderboard requests that were not in the cache",
    0,
);

pub(crate) const LEADERBOARD_RESOLUTIONS_STARTED: MetricCounter = MetricCounter::new(
    "leaderboard_resolutions_started",
    "Leaderboard resolutions started against the chain",
    0,
);

pub(crate) const LEADERBOARD_RESOLUTIONS_JOINED: MetricCounter = MetricCounter::new(
    "leaderboard_resolutions_joined",
    "Leaderboard requests that waited for a resolution already in flight",
    0,
);

pub(crate) const LEADERBOARD_RANK_LOOKUPS: MetricCounter = MetricCounter::new(
    "leaderboard_rank_lookups",
    "Ticket rank lookups issued by leaderboard resolutions",
    0,
);

pub(crate) const LEADERBOARD_FAILED_BATCHES: MetricCounter = MetricCounter::new(
    "leaderboard_failed_batches",
    "Batches in which every item failed",
    0,
);

pub(crate) const CONTRACT_CALL_RETRIES: LabeledMetricCounter = LabeledMetricCounter::new(
    "leaderboard_contract_call_retries",
    "Retried contract calls by failure class",
    0,
    &[&[("class", "rate_limited")], &[("class", "other")]],
);

pub(crate) const TICKET_DETAIL_CACHE_HITS: MetricCounter = MetricCounter::new(
    "ticket_detail_cache_hits",
    "Ticket rank and prize lookups served from the detail cache",
    0,
);

pub(crate) const TICKET_DETAIL_CACHE_MISSES: MetricCounter = MetricCounter::new(
    "ticket_detail_cache_misses",
    "Ticket rank and prize lookups that went to the chain",
    0,
);

pub(crate) fn register_metrics() {
    info!("Initializing leaderboard metrics");
    LEADERBOARD_CACHE_HITS.register();
    LEADERBOARD_CACHE_MISSES.register();
    LEADERBOARD_RESOLUTIONS_STARTED.register();
    LEADERBOARD_RESOLUTIONS_JOINED.register();
    LEADERBOARD_RANK_LOOKUPS.register();
    LEADERBOARD_FAILED_BATCHES.register();
    CONTRACT_CALL_RETRIES.register();
    TICKET_DETAIL_CACHE_HITS.register();
    TICKET_DETAIL_CACHE_MISSES.register();
}
