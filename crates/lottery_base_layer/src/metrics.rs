use lottery_infra_utils::metrics::{LabeledMetricCounter, MetricCounter};
use tracing::info;

use crate::errors::ChainCallErrorKind;

pub(crate) const LOTTERY_CONTRACT_REQUESTS_TOTAL: MetricCounter = MetricCounter::new(
    "lottery_contract_requests_total",
    "Total number of view calls made to the lottery contract, counting each endpoint attempt",
    0,
);

pub(crate) const LOTTERY_CONTRACT_ERRORS_TOTAL: LabeledMetricCounter = LabeledMetricCounter::new(
    "lottery_contract_errors_total",
    "Failed lottery contract view calls by error kind",
    0,
    &[&[("kind", "rate_limited")], &[("kind", "transient")], &[("kind", "permanent")]],
);

pub(crate) fn register_metrics() {
    info!("Initializing lottery contract metrics");
    LOTTERY_CONTRACT_REQUESTS_TOTAL.register();
    LOTTERY_CONTRACT_ERRORS_TOTAL.register();
}

pub(crate) fn record_error(kind: ChainCallErrorKind) {
    LOTTERY_CONTRACT_ERRORS_TOTAL.increment(1, &[("kind", kind.as_str())]);
}
