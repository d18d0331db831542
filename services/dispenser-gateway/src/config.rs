//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > default path. Pool and command
//! definitions are validated at load time so a bad config fails startup
//! instead of failing a draw.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use dispenser::Policy;
use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub pools: BTreeMap<String, PoolConfig>,
    #[serde(default)]
    pub commands: BTreeMap<String, CommandConfig>,
}

/// HTTP server settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Base directory for relative pool file paths
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// One pool definition: a backing file or an inline record list, never both.
#[derive(Debug, Deserialize)]
pub struct PoolConfig {
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub records: Option<Vec<String>>,
}

/// One command trigger and its draw parameters.
#[derive(Debug, Deserialize)]
pub struct CommandConfig {
    pub pool: String,
    /// Unrecognized policy names deserialize as `random_repeat`
    #[serde(default)]
    pub policy: Policy,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Include the remaining stock count in draw responses
    #[serde(default)]
    pub announce_stock: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("pools")
}

fn default_max_connections() -> usize {
    1000
}

fn default_cooldown_secs() -> u64 {
    60
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        for (name, pool) in &config.pools {
            match (&pool.file, &pool.records) {
                (Some(_), Some(_)) => {
                    return Err(common::Error::PoolDef(
                        name.clone(),
                        "define either file or records, not both".into(),
                    ));
                }
                (None, None) => {
                    return Err(common::Error::PoolDef(
                        name.clone(),
                        "define a file path or an inline records list".into(),
                    ));
                }
                _ => {}
            }
        }

        for (trigger, command) in &config.commands {
            if !config.pools.contains_key(&command.pool) {
                return Err(common::Error::Config(format!(
                    "command '{trigger}' references undefined pool '{}'",
                    command.pool
                )));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("dispenser-gateway.toml")
    }
}
