//! Writes the default lottery node config to the path given as the first argument, or to
//! `config/lottery_node/default_config.json`.

use std::env::args;
use std::fs;
use std::path::PathBuf;

use lottery_config::dumping::SerializeConfig;
use lottery_node::config::LotteryNodeConfig;

fn main() -> anyhow::Result<()> {
    let path =
        args().nth(1).map(PathBuf::from).unwrap_or_else(LotteryNodeConfig::default_config_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    LotteryNodeConfig::default().dump_to_file(&path)?;
    println!("Wrote the default config to {}", path.display());
    Ok(())
}
