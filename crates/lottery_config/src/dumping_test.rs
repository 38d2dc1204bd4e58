use std::collections::BTreeMap;
use std::fs::File;

use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::dumping::{prepend_sub_config_name, ser_param, SerializeConfig};
use crate::{ParamPath, ParamPrivacy, ParamPrivacyInput, SerializedParam};

#[derive(Clone, Default, Serialize, Deserialize, Debug, PartialEq)]
struct InnerConfig {
    batch_size: usize,
}

impl SerializeConfig for InnerConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        BTreeMap::from([ser_param(
            "batch_size",
            &self.batch_size,
            "Number of calls per batch.",
            ParamPrivacyInput::Public,
        )])
    }
}

#[derive(Clone, Default, Serialize, Deserialize, Debug, PartialEq)]
struct OuterConfig {
    node_url: String,
    inner: InnerConfig,
}

impl SerializeConfig for OuterConfig {
    fn dump(&self) -> BTreeMap<ParamPath, SerializedParam> {
        let mut dump = BTreeMap::from([ser_param(
            "node_url",
            &self.node_url,
            "Node URL.",
            ParamPrivacyInput::Private,
        )]);
        dump.extend(prepend_sub_config_name(self.inner.dump(), "inner"));
        dump
    }
}

#[test]
fn dump_flattens_sub_configs() {
    let config = OuterConfig {
        node_url: "http://localhost:8545".to_owned(),
        inner: InnerConfig { batch_size: 5 },
    };
    let dump = config.dump();

    assert_eq!(dump.keys().cloned().collect::<Vec<_>>(), vec!["inner.batch_size", "node_url"]);
    assert_eq!(dump["inner.batch_size"].value, json!(5));
    assert_eq!(dump["inner.batch_size"].privacy, ParamPrivacy::Public);
    assert!(dump["node_url"].is_private());
}

#[test]
fn dump_to_file_writes_flat_map() {
    let dir = TempDir::new().unwrap();
    let file_path = dir.path().join("config.json");
    let config = OuterConfig { node_url: "url".to_owned(), inner: InnerConfig { batch_size: 1 } };

    config.dump_to_file(&file_path).unwrap();

    let from_file: Value = serde_json::from_reader(File::open(&file_path).unwrap()).unwrap();
    assert_eq!(from_file["inner.batch_size"]["value"], json!(1));
    assert_eq!(from_file["node_url"]["description"], json!("Node URL."));
}
