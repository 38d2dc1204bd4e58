use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};

use lottery_config::dumping::{ser_param, SerializeConfig};
use lottery_config::{ParamPath, ParamPrivacyInput, SerializedParam};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

pub const HTTP_SERVER_PORT: u16 = 8080;

/// The http server connection related configuration.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct HttpServerConfig {
    pub ip: IpAddr,
    pub port: u16,
}

impl SerializeConfig for HttpServerConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from_iter([
            ser_param("ip", &self.ip.to_string(), "The http server ip.", ParamPrivacyInput::Public),
            ser_param("port", &self.port, "The http server port.", ParamPrivacyInput::Public),
        ])
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self { ip: IpAddr::from(Ipv4Addr::UNSPECIFIED), port: HTTP_SERVER_PORT }
    }
}

impl Display for HttpServerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}
