//! Blockchain configuration.

use powchain_consensus::MinerConfig;
use std::time::Duration;

/// Difficulty used when none is configured.
pub const DEFAULT_DIFFICULTY: u32 = 20;

/// Blockchain configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockchainConfig {
    /// Difficulty for a new chain. Ignored by `load`, which uses the
    /// difficulty recorded in the store.
    pub difficulty: u32,
    /// Mining limits.
    pub miner: MinerConfig,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            miner: MinerConfig::default(),
        }
    }
}

impl BlockchainConfig {
    /// Set the difficulty for a new chain.
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Cap the nonce search.
    pub fn with_max_nonce(mut self, max_nonce: u32) -> Self {
        self.miner.max_nonce = max_nonce;
        self
    }

    /// Give up mining a block after `timeout`.
    pub fn with_mining_timeout(mut self, timeout: Duration) -> Self {
        self.miner.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BlockchainConfig::default();
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(config.miner.max_nonce, u32::MAX);
        assert_eq!(config.miner.timeout, None);
    }

    #[test]
    fn test_builders() {
        let config = BlockchainConfig::default()
            .with_difficulty(8)
            .with_max_nonce(1_000)
            .with_mining_timeout(Duration::from_secs(3));

        assert_eq!(config.difficulty, 8);
        assert_eq!(config.miner.max_nonce, 1_000);
        assert_eq!(config.miner.timeout, Some(Duration::from_secs(3)));
    }
}
