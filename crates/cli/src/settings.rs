//! Per-chain settings saved next to the database.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use powchain_chain::BlockchainConfig;
use powchain_consensus::MinerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "config.json";
const DB_DIR: &str = "db";

/// Location of the sled database inside a data directory.
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_DIR)
}

/// Settings written by `powchain init` and read by every other command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSettings {
    /// Difficulty the chain was created with.
    pub difficulty: u32,
    /// Highest nonce tried per block.
    pub max_nonce: u32,
    /// Per-block mining timeout.
    #[serde(default)]
    pub mining_timeout_secs: Option<u64>,
    /// When the chain was initialized.
    pub created_at: DateTime<Utc>,
}

impl ChainSettings {
    pub fn new(difficulty: u32) -> Self {
        Self {
            difficulty,
            max_nonce: u32::MAX,
            mining_timeout_secs: None,
            created_at: Utc::now(),
        }
    }

    /// Read settings from `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(SETTINGS_FILE);
        let contents = fs::read_to_string(&path).with_context(|| {
            format!(
                "Failed to read {}. Did you run 'powchain init'?",
                path.display()
            )
        })?;
        serde_json::from_str(&contents).with_context(|| format!("Invalid {}", path.display()))
    }

    /// Write settings into `data_dir`, returning the file path.
    pub fn save(&self, data_dir: &Path) -> Result<PathBuf> {
        let path = data_dir.join(SETTINGS_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Blockchain configuration for these settings.
    pub fn blockchain_config(&self) -> BlockchainConfig {
        BlockchainConfig {
            difficulty: self.difficulty,
            miner: MinerConfig {
                max_nonce: self.max_nonce,
                timeout: self.mining_timeout_secs.map(Duration::from_secs),
            },
        }
    }
}
