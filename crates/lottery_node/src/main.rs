use std::env::args;

use lottery_infra_utils::trace_util::configure_tracing;
use lottery_node::config::LotteryNodeConfig;
use lottery_node::node::create_node;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    configure_tracing().await;

    let config = LotteryNodeConfig::load_and_validate(args().collect())?;
    let prometheus_handle = if config.collect_metrics {
        Some(PrometheusBuilder::new().install_recorder()?)
    } else {
        None
    };

    let shutdown = CancellationToken::new();
    let node = create_node(&config, prometheus_handle, shutdown.clone());
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down: signal received");
                shutdown.cancel();
            }
            Err(err) => error!("Failed to listen for the shutdown signal: {err}"),
        }
    });

    info!("START_UP: Starting the lottery node on {}", node.http_server().config);
    node.run().await?;
    info!("Lottery node stopped");
    Ok(())
}
