//! Loads a configuration object, and sets values to the fields of the object.
//!
//! Values are taken, in increasing precedence, from:
//! 1. The default config map dumped by [`crate::dumping::SerializeConfig::dump`].
//! 2. A JSON file of `{ "param.path": value }` pairs given by `--config_file`.
//! 3. Command line arguments of the form `--param.path value`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;

use clap::{Arg, ArgMatches, Command};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use validator::Validate;

use crate::{ConfigError, ParamPath, SerializedParam, CONFIG_FILE_ARG_NAME, FIELD_SEPARATOR};

#[cfg(test)]
#[path = "loading_test.rs"]
mod loading_test;

/// Loads a config object from the default config map, a config file and command line arguments,
/// then validates it.
pub fn load_and_validate_config<T: for<'a> Deserialize<'a> + Validate>(
    default_config_map: BTreeMap<ParamPath, SerializedParam>,
    command: Command,
    args: Vec<String>,
) -> Result<T, ConfigError> {
    let config: T = load_and_process_config(default_config_map, command, args)?;
    config.validate()?;
    Ok(config)
}

/// Loads a config object from the default config map, a config file and command line arguments.
pub fn load_and_process_config<T: for<'a> Deserialize<'a>>(
    default_config_map: BTreeMap<ParamPath, SerializedParam>,
    command: Command,
    args: Vec<String>,
) -> Result<T, ConfigError> {
    let mut values: BTreeMap<ParamPath, Value> = default_config_map
        .iter()
        .map(|(param_path, serialized_param)| (param_path.clone(), serialized_param.value.clone()))
        .collect();

    let arg_matches = get_command_matches(&default_config_map, command, args)?;

    if let Some(file_path) = arg_matches.get_one::<String>(CONFIG_FILE_ARG_NAME) {
        info!("Loading config file {file_path}.");
        update_config_map_by_file(&mut values, file_path)?;
    }
    update_config_map_by_command_args(&mut values, &arg_matches)?;

    load(&values)
}

/// Deserializes a flat map of param paths into a config object.
pub fn load<T: for<'a> Deserialize<'a>>(
    config_map: &BTreeMap<ParamPath, Value>,
) -> Result<T, ConfigError> {
    let mut nested_map = Value::Object(Map::new());
    for (param_path, value) in config_map {
        insert_nested(&mut nested_map, param_path, value.clone());
    }
    Ok(serde_json::from_value(nested_map)?)
}

fn insert_nested(nested_map: &mut Value, param_path: &str, value: Value) {
    let mut entry = nested_map;
    let mut path = param_path.split(FIELD_SEPARATOR).peekable();
    while let Some(name) = path.next() {
        let Value::Object(map) = entry else {
            unreachable!("Config paths only descend through objects.");
        };
        if path.peek().is_none() {
            map.insert(name.to_owned(), value);
            return;
        }
        entry = map.entry(name.to_owned()).or_insert_with(|| Value::Object(Map::new()));
    }
}

fn get_command_matches(
    config_map: &BTreeMap<ParamPath, SerializedParam>,
    command: Command,
    command_input: Vec<String>,
) -> Result<ArgMatches, ConfigError> {
    let command = command.arg(
        Arg::new(CONFIG_FILE_ARG_NAME)
            .long(CONFIG_FILE_ARG_NAME)
            .short('f')
            .num_args(1)
            .help("Optionally sets a config file to use"),
    );
    let command = config_map.iter().fold(command, |command, (param_path, serialized_param)| {
        command.arg(
            Arg::new(param_path.clone())
                .long(param_path.clone())
                .num_args(1)
                .help(serialized_param.description.clone()),
        )
    });
    Ok(command.try_get_matches_from(command_input)?)
}

fn update_config_map_by_file(
    config_map: &mut BTreeMap<ParamPath, Value>,
    file_path: &str,
) -> Result<(), ConfigError> {
    let file = File::open(file_path)?;
    let file_values: Value = serde_json::from_reader(BufReader::new(file))?;
    let Value::Object(file_values) = file_values else {
        return Err(ConfigError::ConfigFileNotAnObject { file_path: file_path.to_owned() });
    };
    for (param_path, value) in file_values {
        let Some(entry) = config_map.get_mut(&param_path) else {
            return Err(ConfigError::UnexpectedParam { param_path });
        };
        debug!("Setting {param_path} from config file.");
        *entry = value;
    }
    Ok(())
}

fn update_config_map_by_command_args(
    config_map: &mut BTreeMap<ParamPath, Value>,
    arg_matches: &ArgMatches,
) -> Result<(), ConfigError> {
    for (param_path, value) in config_map.iter_mut() {
        let Some(raw_value) = arg_matches.get_one::<String>(param_path) else {
            continue;
        };
        debug!("Setting {param_path} from command line.");
        *value = parse_command_line_value(param_path, raw_value, value)?;
    }
    Ok(())
}

// The command line carries only strings, so the expected type is taken from the current value.
fn parse_command_line_value(
    param_path: &str,
    raw_value: &str,
    current_value: &Value,
) -> Result<Value, ConfigError> {
    let parse_error = || ConfigError::ParseCommandLineValue {
        param_path: param_path.to_owned(),
        raw_value: raw_value.to_owned(),
        expected: current_value.clone(),
    };
    match current_value {
        Value::Bool(_) => raw_value.parse::<bool>().map(Value::Bool).map_err(|_| parse_error()),
        Value::Number(_) => serde_json::from_str::<serde_json::Number>(raw_value)
            .map(Value::Number)
            .map_err(|_| parse_error()),
        // An unset optional param gives no type hint: take JSON if it parses, a string otherwise.
        Value::Null => Ok(serde_json::from_str(raw_value)
            .unwrap_or_else(|_| Value::String(raw_value.to_owned()))),
        _ => Ok(Value::String(raw_value.to_owned())),
    }
}
