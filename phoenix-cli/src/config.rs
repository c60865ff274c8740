///! CLI configuration management

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Production cluster whose automated snapshots seed the clone
    pub source_cluster: String,
    /// Identifier prefix of the clone; a timestamp gets appended on restore
    pub clone_prefix: String,
    /// Node type the clone is resized to
    pub node_type: String,
    /// Node count the clone is resized to
    pub number_of_nodes: i32,
    /// Hosted zone holding the alias record
    pub hosted_zone_id: String,
    /// Alias record pointed at the clone's endpoint
    pub record_name: String,
    /// Alias record TTL in seconds
    pub record_ttl: i64,
    /// Fixed delay between status polls
    pub poll_interval_secs: u64,
    /// Grace period before the previous clone is deleted
    pub delete_delay_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_cluster: String::new(),
            clone_prefix: String::new(),
            node_type: "dc2.large".to_string(),
            number_of_nodes: 2,
            hosted_zone_id: String::new(),
            record_name: String::new(),
            record_ttl: 300,
            poll_interval_secs: 30,
            delete_delay_secs: 300,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&contents)?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(config_path, contents)?;

        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(home).join(".config/phoenix/cli.toml"))
    }
}
