//! sled database wrapper.

use powchain_core::CodecError;
use sled::{Db, Tree};
use std::path::Path;
use thiserror::Error;

/// Tree holding encoded blocks keyed by their 32-byte hash.
pub const BLOCKS_TREE: &str = "blocks";

/// Tree holding the chain metadata singleton.
pub const META_TREE: &str = "chain_meta";

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Block codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Unsupported chain metadata version {0}")]
    UnsupportedMetaVersion(u8),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Wrapper around a sled database and the two trees the chain uses.
#[derive(Debug, Clone)]
pub struct Storage {
    db: Db,
    blocks: Tree,
    meta: Tree,
}

impl Storage {
    /// Open a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let blocks = db.open_tree(BLOCKS_TREE)?;
        let meta = db.open_tree(META_TREE)?;
        Ok(Self { db, blocks, meta })
    }

    /// The block tree (for advanced operations and repair tooling).
    pub fn blocks(&self) -> &Tree {
        &self.blocks
    }

    /// The metadata tree.
    pub fn meta(&self) -> &Tree {
        &self.meta
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
