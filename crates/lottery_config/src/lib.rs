//! Configuration utilities for the lottery services.
//!
//! Every config struct implements [`dumping::SerializeConfig`], which flattens it into a map from
//! dotted parameter paths to their default values and descriptions:
//!
//! ```json
//! "conf1.conf2.param_name": {
//!     "description": "Param description.",
//!     "value": json_value,
//!     "privacy": "Public"
//! }
//! ```
//!
//! [`loading::load_and_process_config`] takes such a map, overrides it with a config file and
//! command line arguments, and deserializes the result into the config struct.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use validator::ValidationErrors;

pub mod converters;
pub mod dumping;
pub mod loading;

/// Arg name for providing a configuration file.
pub const CONFIG_FILE_ARG_NAME: &str = "config_file";

/// Separates the names of nested configs in a param path.
pub const FIELD_SEPARATOR: &str = ".";

/// A nested path of a configuration parameter.
pub type ParamPath = String;

/// A description of a configuration parameter.
pub type Description = String;

/// Whether a parameter may be exposed, e.g. in logs or in a dumped config file.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ParamPrivacyInput {
    /// The field is visible only by a secret.
    Private,
    /// The field is visible by anyone.
    Public,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ParamPrivacy {
    Private,
    Public,
}

impl From<ParamPrivacyInput> for ParamPrivacy {
    fn from(user_param_privacy: ParamPrivacyInput) -> Self {
        match user_param_privacy {
            ParamPrivacyInput::Private => ParamPrivacy::Private,
            ParamPrivacyInput::Public => ParamPrivacy::Public,
        }
    }
}

/// A serialized configuration parameter: its description, default value and privacy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedParam {
    pub description: Description,
    pub value: Value,
    pub privacy: ParamPrivacy,
}

impl SerializedParam {
    pub fn is_private(&self) -> bool {
        self.privacy == ParamPrivacy::Private
    }
}

/// Errors at the configuration dumping and loading process.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    CommandInput(#[from] clap::error::Error),
    #[error(transparent)]
    MissingParam(#[from] serde_json::Error),
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Received an unexpected parameter: {param_path}.")]
    UnexpectedParam { param_path: ParamPath },
    #[error("Config file {file_path} must contain a JSON object.")]
    ConfigFileNotAnObject { file_path: String },
    #[error("Couldn't parse {param_path} value {raw_value:?}, expected a value like {expected}.")]
    ParseCommandLineValue { param_path: ParamPath, raw_value: String, expected: Value },
    #[error(transparent)]
    ValidationError(#[from] ValidationErrors),
}
