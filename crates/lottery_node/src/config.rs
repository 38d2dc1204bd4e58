use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Command;
use lottery_base_layer::ethereum_lottery_contract::EthereumLotteryContractConfig;
use lottery_config::dumping::{prepend_sub_config_name, ser_param, SerializeConfig};
use lottery_config::loading::load_and_validate_config;
use lottery_config::{ConfigError, ParamPath, ParamPrivacyInput, SerializedParam};
use lottery_http_server::config::HttpServerConfig;
use lottery_leaderboard::config::LeaderboardConfig;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const DEFAULT_CONFIG_PATH: &str = "config/lottery_node/default_config.json";

/// The configurations of the lottery node's components.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct LotteryNodeConfig {
    #[validate(nested)]
    pub base_layer_config: EthereumLotteryContractConfig,
    #[validate(nested)]
    pub leaderboard_config: LeaderboardConfig,
    #[validate(nested)]
    pub http_server_config: HttpServerConfig,
    pub collect_metrics: bool,
}

impl Default for LotteryNodeConfig {
    fn default() -> Self {
        Self {
            base_layer_config: EthereumLotteryContractConfig::default(),
            leaderboard_config: LeaderboardConfig::default(),
            http_server_config: HttpServerConfig::default(),
            collect_metrics: true,
        }
    }
}

impl SerializeConfig for LotteryNodeConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        let mut config = BTreeMap::from_iter([ser_param(
            "collect_metrics",
            &self.collect_metrics,
            "If true, collect metrics and serve them at /monitoring/metrics.",
            ParamPrivacyInput::Public,
        )]);
        config.extend(prepend_sub_config_name(self.base_layer_config.dump(), "base_layer_config"));
        config.extend(prepend_sub_config_name(
            self.leaderboard_config.dump(),
            "leaderboard_config",
        ));
        config.extend(prepend_sub_config_name(
            self.http_server_config.dump(),
            "http_server_config",
        ));
        config
    }
}

impl LotteryNodeConfig {
    /// Loads the config from the defaults, an optional `--config_file` and command line overrides.
    pub fn load_and_validate(args: Vec<String>) -> Result<Self, ConfigError> {
        let command = Command::new("lottery_node").about("Lottery leaderboard service.");
        load_and_validate_config(Self::default().dump(), command, args)
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }
}
