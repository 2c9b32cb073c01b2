//! Persistent storage layer for powchain.
//!
//! This crate provides the storage backend for the chain:
//! - Block records keyed by block hash
//! - A single chain metadata record (tip hash, difficulty)
//! - Atomic transactions spanning both
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Application Layer                     │
//! │                 (Blockchain, Miner, CLI)                 │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                   Storage Layer                          │
//! │  ┌──────────────────────────┐  ┌──────────────────────┐  │
//! │  │ ChainStore               │  │ Storage (DB)         │  │
//! │  │  - blocks by hash        │  │  - sled wrapper      │  │
//! │  │  - chain metadata        │  │  - `blocks` tree     │  │
//! │  │  - transactions / reset  │  │  - `chain_meta` tree │  │
//! │  └──────────────────────────┘  └──────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │
//! ┌────────────────────────▼────────────────────────────────┐
//! │                    sled Database                         │
//! │              (Embedded Key-Value Store)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_storage::{ChainMeta, ChainStore, Storage, StorageError};
//! use powchain_core::Block;
//!
//! let storage = Storage::open("./chain_data").unwrap();
//! let chain = ChainStore::new(&storage);
//!
//! let genesis = Block::genesis(8);
//! let committed: Result<(), StorageError> = chain.transaction(|tx| {
//!     let hash = tx.put_block(&genesis)?;
//!     tx.put_meta(&ChainMeta::new(hash, 8))
//! });
//! committed.unwrap();
//! ```

pub mod chain;
pub mod db;

// Re-export commonly used types
pub use chain::{ChainMeta, ChainStore, ChainTx, TxError, TxResult, META_VERSION_1};
pub use db::{Result, Storage, StorageError};
