use std::sync::Arc;

use lottery_base_layer::ethereum_lottery_contract::EthereumLotteryContract;
use lottery_base_layer::SharedLotteryContractReader;
use lottery_http_server::errors::HttpServerRunError;
use lottery_http_server::http_server::{create_http_server, HttpServer};
use lottery_leaderboard::create_lottery_data_service;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::LotteryNodeConfig;

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;

pub struct LotteryNode {
    http_server: HttpServer,
    shutdown: CancellationToken,
}

impl LotteryNode {
    pub fn http_server(&self) -> &HttpServer {
        &self.http_server
    }

    /// Serves requests until the shutdown token is cancelled. In-flight resolutions are aborted
    /// at their next batch boundary.
    pub async fn run(&self) -> Result<(), HttpServerRunError> {
        self.http_server.run(self.shutdown.clone()).await
    }
}

pub fn create_node(
    config: &LotteryNodeConfig,
    prometheus_handle: Option<PrometheusHandle>,
    shutdown: CancellationToken,
) -> LotteryNode {
    info!("Creating lottery node components.");
    let reader: SharedLotteryContractReader =
        Arc::new(EthereumLotteryContract::new(config.base_layer_config.clone()));
    let lottery_data_service =
        create_lottery_data_service(&config.leaderboard_config, reader, shutdown.clone());
    let http_server = create_http_server(
        config.http_server_config,
        Arc::new(lottery_data_service),
        prometheus_handle,
    );
    LotteryNode { http_server, shutdown }
}
