use std::net::SocketAddr;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use lottery_leaderboard_types::{parse_round_id, Address, SharedLotteryDataClient};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::config::HttpServerConfig;
use crate::errors::{HttpServerError, HttpServerRunError};
use crate::metrics::{
    init_metrics,
    PRIZES_REQUESTS_FAILED,
    PRIZES_REQUESTS_TOTAL,
    TOP_RANKS_REQUESTS_FAILED,
    TOP_RANKS_REQUESTS_TOTAL,
};
use crate::responses::{PrizesResponse, TopRanksResponse};

#[cfg(test)]
#[path = "http_server_test.rs"]
mod http_server_test;

pub type HttpServerResult<T> = Result<T, HttpServerError>;

pub const TOP_RANKS_PATH: &str = "/api/top-ranks";
pub const PRIZES_PATH: &str = "/api/prizes";
pub const IS_ALIVE_PATH: &str = "/api/is_alive";
pub const METRICS_PATH: &str = "/monitoring/metrics";

pub struct HttpServer {
    pub config: HttpServerConfig,
    app_state: AppState,
}

#[derive(Clone)]
pub struct AppState {
    pub lottery_data_client: SharedLotteryDataClient,
    pub prometheus_handle: Option<PrometheusHandle>,
}

#[derive(Debug, Deserialize)]
pub struct TopRanksQuery {
    #[serde(rename = "roundId")]
    pub round_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PrizesQuery {
    pub account: Option<String>,
}

impl HttpServer {
    pub fn new(
        config: HttpServerConfig,
        lottery_data_client: SharedLotteryDataClient,
        prometheus_handle: Option<PrometheusHandle>,
    ) -> Self {
        let app_state = AppState { lottery_data_client, prometheus_handle };
        HttpServer { config, app_state }
    }

    /// Serves until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), HttpServerRunError> {
        init_metrics();

        let HttpServerConfig { ip, port } = self.config;
        let addr = SocketAddr::new(ip, port);
        let listener = TcpListener::bind(addr).await?;
        info!("HttpServer running using socket: {}", addr);

        axum::serve(listener, self.app())
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        info!("HttpServer stopped");
        Ok(())
    }

    pub fn app(&self) -> Router {
        Router::new()
            .route(TOP_RANKS_PATH, get(top_ranks))
            .route(PRIZES_PATH, get(prizes))
            .route(METRICS_PATH, get(metrics))
            .route(IS_ALIVE_PATH, get(is_alive))
            .with_state(self.app_state.clone())
    }
}

// HttpServer handlers.

#[instrument(skip(app_state))]
async fn top_ranks(
    State(app_state): State<AppState>,
    Query(query): Query<TopRanksQuery>,
) -> HttpServerResult<Json<TopRanksResponse>> {
    TOP_RANKS_REQUESTS_TOTAL.increment(1);
    top_ranks_inner(app_state, query).await.inspect_err(|_| TOP_RANKS_REQUESTS_FAILED.increment(1))
}

async fn top_ranks_inner(
    app_state: AppState,
    query: TopRanksQuery,
) -> HttpServerResult<Json<TopRanksResponse>> {
    let round_id = parse_round_id(query.round_id.as_deref())?;
    let outcome = app_state.lottery_data_client.get_leaderboard(round_id).await?;
    Ok(Json(TopRanksResponse::from(outcome)))
}

#[instrument(skip(app_state))]
async fn prizes(
    State(app_state): State<AppState>,
    Query(query): Query<PrizesQuery>,
) -> HttpServerResult<Json<PrizesResponse>> {
    PRIZES_REQUESTS_TOTAL.increment(1);
    prizes_inner(app_state, query).await.inspect_err(|_| PRIZES_REQUESTS_FAILED.increment(1))
}

async fn prizes_inner(
    app_state: AppState,
    query: PrizesQuery,
) -> HttpServerResult<Json<PrizesResponse>> {
    let account = parse_account(query.account.as_deref())?;
    let summary = app_state.lottery_data_client.scan_prizes(account).await?;
    Ok(Json(PrizesResponse::from(summary)))
}

async fn is_alive() -> String {
    "Lottery service is alive!".to_owned()
}

async fn metrics(State(app_state): State<AppState>) -> impl IntoResponse {
    match app_state.prometheus_handle {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::METHOD_NOT_ALLOWED, "Metrics are not collected".to_owned()),
    }
}

fn parse_account(raw: Option<&str>) -> HttpServerResult<Address> {
    let raw = raw.unwrap_or_default();
    raw.trim().parse().map_err(|_| HttpServerError::InvalidAccount { raw: raw.to_owned() })
}

pub fn create_http_server(
    config: HttpServerConfig,
    lottery_data_client: SharedLotteryDataClient,
    prometheus_handle: Option<PrometheusHandle>,
) -> HttpServer {
    HttpServer::new(config, lottery_data_client, prometheus_handle)
}
