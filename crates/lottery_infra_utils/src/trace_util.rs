use time::macros::format_description;
use tokio::sync::OnceCell;
use tracing::info;
use tracing::metadata::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[cfg(test)]
#[path = "trace_util_test.rs"]
mod trace_util_test;

const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;
// Ensures the subscriber is installed only once per process.
static TRACING_INITIALIZED: OnceCell<()> = OnceCell::const_new();

/// Installs the global tracing subscriber: compact lines with UTC timestamps, file and line, and a
/// level filter that honours `RUST_LOG`.
pub async fn configure_tracing() {
    TRACING_INITIALIZED
        .get_or_init(|| async {
            let time_format = format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
            );
            let timer = UtcTime::new(time_format);

            let fmt_layer = fmt::layer()
                .compact()
                .with_timer(timer)
                .with_target(false)
                .with_file(true)
                .with_line_number(true);

            // `try_init` so that tests which installed their own subscriber keep it.
            let installed = tracing_subscriber::registry()
                .with(fmt_layer)
                .with(get_filter_layer(DEFAULT_LEVEL))
                .try_init();
            if installed.is_ok() {
                info!("Tracing has been successfully initialized.");
            }
        })
        .await;
}

fn get_filter_layer(level: LevelFilter) -> EnvFilter {
    let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    ["alloy_provider", "alloy_transport_http", "alloy_rpc_client", "hyper", "hyper_util", "reqwest"]
        .into_iter()
        .filter_map(|target| format!("{target}=info").parse().ok())
        .fold(filter, |filter, directive| filter.add_directive(directive))
}
