pub mod config;
pub mod errors;
pub mod http_server;
pub(crate) mod metrics;
pub mod responses;
