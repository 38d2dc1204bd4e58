use lottery_infra_utils::metrics::MetricCounter;

pub(crate) const TOP_RANKS_REQUESTS_TOTAL: MetricCounter =
    MetricCounter::new("http_top_ranks_requests_total", "Requests to the top ranks endpoint", 0);

pub(crate) const TOP_RANKS_REQUESTS_FAILED: MetricCounter = MetricCounter::new(
    "http_top_ranks_requests_failed",
    "Top ranks requests answered with an error",
    0,
);

pub(crate) const PRIZES_REQUESTS_TOTAL: MetricCounter =
    MetricCounter::new("http_prizes_requests_total", "Requests to the prizes endpoint", 0);

pub(crate) const PRIZES_REQUESTS_FAILED: MetricCounter =
    MetricCounter::new("http_prizes_requests_failed", "Prizes requests answered with an error", 0);

pub(crate) fn init_metrics() {
    TOP_RANKS_REQUESTS_TOTAL.register();
    TOP_RANKS_REQUESTS_FAILED.register();
    PRIZES_REQUESTS_TOTAL.register();
    PRIZES_REQUESTS_FAILED.register();
}
