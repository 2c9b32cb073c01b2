//! Proof-of-work consensus for powchain.
//!
//! This crate provides:
//! - The mining search over the header nonce, with cancellation
//! - Block validation with diagnostic errors
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_consensus::{BlockValidator, Miner, MinerConfig};
//! use powchain_core::{Block, BlockHeader, Hash};
//!
//! let miner = Miner::new(MinerConfig::default());
//! let mut header = BlockHeader::new(Hash([1u8; 32]), 8);
//! miner.mine(&mut header).unwrap();
//!
//! let block = Block::new(header);
//! BlockValidator::validate(&block).unwrap();
//! ```

pub mod miner;
pub mod validator;

// Re-export commonly used types
pub use miner::{CancelReason, Miner, MinerConfig, MiningError, CANCEL_POLL_INTERVAL};
pub use validator::{BlockValidator, ValidationError};
