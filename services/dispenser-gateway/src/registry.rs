//! Command registry: triggers resolved to pools and draw parameters
//!
//! Built once from configuration at startup. Triggers match the way the
//! chat layer sends them: trimmed and lowercased. Commands sharing a pool
//! name share the same `PoolRef`, so their draws serialize through the same
//! lock in the engine.

use std::collections::BTreeMap;
use std::time::Duration;

use common::Record;
use dispenser::Policy;
use pool_store::PoolRef;

use crate::config::Config;

/// A command's resolved draw parameters.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// Normalized trigger, also the cooldown key
    pub trigger: String,
    pub pool_name: String,
    pub pool: PoolRef,
    pub policy: Policy,
    pub cooldown: Duration,
    pub announce_stock: bool,
}

/// Immutable lookup tables built from configuration.
#[derive(Debug, Default)]
pub struct Registry {
    commands: BTreeMap<String, CommandSpec>,
    pools: BTreeMap<String, PoolRef>,
}

impl Registry {
    pub fn from_config(config: &Config) -> Self {
        let mut pools = BTreeMap::new();
        for (name, pool_config) in &config.pools {
            let pool = match (&pool_config.file, &pool_config.records) {
                (Some(file), _) => {
                    let path = if file.is_absolute() {
                        file.clone()
                    } else {
                        config.server.data_dir.join(file)
                    };
                    PoolRef::durable(path)
                }
                (None, Some(lines)) => {
                    PoolRef::in_memory(lines.iter().map(Record::new).collect())
                }
                // Rejected by Config::load; an empty pool keeps lookups total
                (None, None) => PoolRef::in_memory(Vec::new()),
            };
            pools.insert(name.clone(), pool);
        }

        let mut commands = BTreeMap::new();
        for (trigger, command) in &config.commands {
            let Some(pool) = pools.get(&command.pool) else {
                continue;
            };
            let trigger = normalize(trigger);
            commands.insert(
                trigger.clone(),
                CommandSpec {
                    trigger,
                    pool_name: command.pool.clone(),
                    pool: pool.clone(),
                    policy: command.policy,
                    cooldown: Duration::from_secs(command.cooldown_secs),
                    announce_stock: command.announce_stock,
                },
            );
        }

        Self { commands, pools }
    }

    /// Resolve a trigger as the chat layer sends it.
    pub fn command(&self, trigger: &str) -> Option<&CommandSpec> {
        self.commands.get(&normalize(trigger))
    }

    pub fn pool(&self, name: &str) -> Option<&PoolRef> {
        self.pools.get(name)
    }

    /// All pools in name order.
    pub fn pools(&self) -> impl Iterator<Item = (&String, &PoolRef)> {
        self.pools.iter()
    }
}

fn normalize(trigger: &str) -> String {
    trigger.trim().to_lowercase()
}
