pub mod metrics;
pub mod trace_util;
