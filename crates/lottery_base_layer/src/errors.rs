use alloy::rpc::json_rpc::RpcError;
use alloy::transports::TransportErrorKind;
use thiserror::Error;

use crate::ContractFunction;

#[cfg(test)]
#[path = "errors_test.rs"]
mod errors_test;

pub type ChainCallResult<T> = Result<T, ChainCallError>;

const HTTP_TOO_MANY_REQUESTS: u16 = 429;
// Returned by several providers (Infura, Alchemy) when a request quota is exceeded.
const JSON_RPC_LIMIT_EXCEEDED: i64 = -32005;
// Geth returns this code for reverted `eth_call`s.
const JSON_RPC_EXECUTION_REVERTED: i64 = 3;
const RATE_LIMIT_MESSAGES: [&str; 3] = ["rate limit", "Too Many Requests", "429"];

/// A failed read from the lottery contract. The variant decides how the caller backs off.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChainCallError {
    #[error("{function} was rate limited: {message}")]
    RateLimited { function: ContractFunction, message: String },
    #[error("{function} failed: {message}")]
    Transient { function: ContractFunction, message: String },
    #[error("{function} failed permanently: {message}")]
    Permanent { function: ContractFunction, message: String },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainCallErrorKind {
    RateLimited,
    Transient,
    Permanent,
}

impl ChainCallErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChainCallErrorKind::RateLimited => "rate_limited",
            ChainCallErrorKind::Transient => "transient",
            ChainCallErrorKind::Permanent => "permanent",
        }
    }
}

impl ChainCallError {
    pub fn kind(&self) -> ChainCallErrorKind {
        match self {
            ChainCallError::RateLimited { .. } => ChainCallErrorKind::RateLimited,
            ChainCallError::Transient { .. } => ChainCallErrorKind::Transient,
            ChainCallError::Permanent { .. } => ChainCallErrorKind::Permanent,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ChainCallErrorKind::RateLimited
    }

    pub fn function(&self) -> ContractFunction {
        match self {
            ChainCallError::RateLimited { function, .. }
            | ChainCallError::Transient { function, .. }
            | ChainCallError::Permanent { function, .. } => *function,
        }
    }
}

pub(crate) fn classify_contract_error(
    function: ContractFunction,
    error: alloy::contract::Error,
) -> ChainCallError {
    match error {
        alloy::contract::Error::TransportError(rpc_error) => {
            classify_rpc_error(function, rpc_error)
        }
        // Decoding and call-construction failures don't go away on retry.
        other => ChainCallError::Permanent { function, message: other.to_string() },
    }
}

pub(crate) fn classify_rpc_error(
    function: ContractFunction,
    error: RpcError<TransportErrorKind>,
) -> ChainCallError {
    let message = error.to_string();
    match &error {
        RpcError::Transport(TransportErrorKind::HttpError(http_error))
            if http_error.status == HTTP_TOO_MANY_REQUESTS =>
        {
            ChainCallError::RateLimited { function, message }
        }
        RpcError::ErrorResp(payload)
            if payload.code == JSON_RPC_LIMIT_EXCEEDED || is_rate_limit_message(&payload.message) =>
        {
            ChainCallError::RateLimited { function, message }
        }
        RpcError::ErrorResp(payload)
            if payload.code == JSON_RPC_EXECUTION_REVERTED
                || payload.message.contains("execution reverted") =>
        {
            ChainCallError::Permanent { function, message }
        }
        RpcError::SerError(_) | RpcError::DeserError { .. } => {
            ChainCallError::Permanent { function, message }
        }
        // Some transports only surface the status inside their error text.
        _ if is_rate_limit_message(&message) => ChainCallError::RateLimited { function, message },
        _ => ChainCallError::Transient { function, message },
    }
}

fn is_rate_limit_message(message: &str) -> bool {
    RATE_LIMIT_MESSAGES.iter().any(|pattern| message.contains(pattern))
}
