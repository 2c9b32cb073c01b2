//! Blockchain orchestration for powchain.
//!
//! This crate brings the pieces together:
//! - **Initialization**: reset the store and commit a genesis block
//! - **Mining**: build a candidate on the tip, search the nonce, commit
//! - **Appending**: validate, check linkage, commit block and tip atomically
//! - **Loading**: rebuild the in-memory view and verify the whole chain
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_chain::{Blockchain, BlockchainConfig};
//! use powchain_storage::Storage;
//!
//! let storage = Storage::open("./chain_data").unwrap();
//! let config = BlockchainConfig::default().with_difficulty(16);
//!
//! let chain = Blockchain::initialize(&storage, config.clone()).unwrap();
//! let block = chain.mine_new_block().unwrap();
//! assert_eq!(chain.tip(), block.hash());
//!
//! // After a restart
//! let chain = Blockchain::load(&storage, config).unwrap();
//! assert_eq!(chain.height(), 1);
//! ```

pub mod blockchain;
pub mod config;

// Re-export commonly used types
pub use blockchain::{
    Blockchain, BlockchainError, BlockchainStats, ChainState, CorruptChainError, Result,
};
pub use config::{BlockchainConfig, DEFAULT_DIFFICULTY};
