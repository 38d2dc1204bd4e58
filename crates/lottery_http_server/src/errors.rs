use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lottery_leaderboard_types::errors::{LeaderboardError, PrizeScannerError};
use thiserror::Error;
use tracing::{debug, error};

use crate::responses::ErrorResponse;

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;

/// Errors originating from `[`HttpServer::run`]` command.
#[derive(Debug, Error)]
pub enum HttpServerRunError {
    #[error(transparent)]
    ServerStartupError(#[from] std::io::Error),
}

/// Errors that may occur while serving a request.
#[derive(Debug, Error)]
pub enum HttpServerError {
    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),
    #[error("Invalid account: {raw:?}")]
    InvalidAccount { raw: String },
    #[error(transparent)]
    PrizeScanner(#[from] PrizeScannerError),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            HttpServerError::Leaderboard(LeaderboardError::MissingRoundId) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new("roundId parameter is required", None))
            }
            HttpServerError::Leaderboard(LeaderboardError::InvalidRoundId { raw }) => {
                debug!("Rejected roundId {raw:?}");
                (StatusCode::BAD_REQUEST, ErrorResponse::new("Invalid roundId", None))
            }
            HttpServerError::Leaderboard(err) => {
                error!("Failed to fetch top ranks: {err}");
                let details = sanitize(&err.to_string());
                let body = ErrorResponse::new("Failed to fetch top ranks", Some(details));
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            HttpServerError::InvalidAccount { raw } => {
                debug!("Rejected account {raw:?}");
                (StatusCode::BAD_REQUEST, ErrorResponse::new("Invalid account", None))
            }
            HttpServerError::PrizeScanner(err) => {
                error!("Failed to fetch prizes: {err}");
                let details = sanitize(&err.to_string());
                let body = ErrorResponse::new("Failed to fetch prizes", Some(details));
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Replaces everything but alphanumerics and some punctuation with `?`, so error details cannot
/// carry markup back to the client.
fn sanitize(message: &str) -> String {
    message
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || " :.,[]_-".contains(c) { c } else { '?' })
        .collect()
}
