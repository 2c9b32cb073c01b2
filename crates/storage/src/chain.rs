//! Block storage and chain metadata.
//!
//! Blocks live in the `blocks` tree keyed by the raw 32 bytes of their
//! hash. The `chain_meta` tree holds one record under [`META_KEY`]: the tip
//! hash and the chain difficulty. Writes that must land together go through
//! [`ChainStore::transaction`].

use crate::db::{Result, Storage, StorageError};
use powchain_core::{Block, Hash};
use serde::{Deserialize, Serialize};
use sled::transaction::{TransactionError, TransactionalTree};
use sled::Transactional;
use tracing::{debug, info, warn};

pub use sled::transaction::ConflictableTransactionError as TxError;

/// Result of an operation inside a store transaction.
pub type TxResult<T, E> = std::result::Result<T, TxError<E>>;

/// Key of the metadata singleton.
pub const META_KEY: &[u8] = b"meta";

/// The only metadata format version currently defined.
pub const META_VERSION_1: u8 = 1;

/// Chain metadata: where the chain ends and how hard it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMeta {
    /// Format version.
    pub version: u8,
    /// Hash of the most recently committed block.
    pub tip: Hash,
    /// Leading-zero-bit difficulty, fixed for the chain's lifetime.
    pub difficulty: u32,
}

impl ChainMeta {
    /// Create a metadata record.
    pub fn new(tip: Hash, difficulty: u32) -> Self {
        Self {
            version: META_VERSION_1,
            tip,
            difficulty,
        }
    }

    /// Same chain, new tip.
    pub fn with_tip(self, tip: Hash) -> Self {
        Self { tip, ..self }
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let meta: Self = bincode::deserialize(bytes)?;
        if meta.version != META_VERSION_1 {
            return Err(StorageError::UnsupportedMetaVersion(meta.version));
        }
        Ok(meta)
    }
}

fn abort<E, S>(err: S) -> TxError<E>
where
    S: Into<StorageError>,
    E: From<StorageError>,
{
    TxError::Abort(E::from(err.into()))
}

/// View of both trees inside one atomic transaction.
///
/// Every method is generic over the caller's error type so that the
/// transaction body can abort with its own errors as well as storage ones.
pub struct ChainTx<'t> {
    blocks: &'t TransactionalTree,
    meta: &'t TransactionalTree,
}

impl ChainTx<'_> {
    /// Get a block by its hash.
    pub fn get_block<E: From<StorageError>>(&self, hash: &Hash) -> TxResult<Option<Block>, E> {
        match self.blocks.get(&hash.0[..])? {
            Some(bytes) => Block::decode(&bytes).map(Some).map_err(abort),
            None => Ok(None),
        }
    }

    /// Store a block under its hash. Returns the hash.
    pub fn put_block<E: From<StorageError>>(&self, block: &Block) -> TxResult<Hash, E> {
        let hash = block.hash();
        let bytes = block.encode().map_err(abort)?;
        self.blocks.insert(&hash.0[..], bytes)?;
        Ok(hash)
    }

    /// Read the chain metadata.
    pub fn get_meta<E: From<StorageError>>(&self) -> TxResult<Option<ChainMeta>, E> {
        match self.meta.get(META_KEY)? {
            Some(bytes) => ChainMeta::decode(&bytes).map(Some).map_err(abort),
            None => Ok(None),
        }
    }

    /// Write the chain metadata.
    pub fn put_meta<E: From<StorageError>>(&self, meta: &ChainMeta) -> TxResult<(), E> {
        let bytes = meta.encode().map_err(abort)?;
        self.meta.insert(META_KEY, bytes)?;
        Ok(())
    }
}

/// Manages block storage and chain metadata.
pub struct ChainStore<'a> {
    storage: &'a Storage,
}

impl<'a> ChainStore<'a> {
    /// Create a new ChainStore wrapping the given storage.
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    // =========================================================================
    // Block Storage
    // =========================================================================

    /// Store a block keyed by its hash, outside any transaction.
    pub fn put_block(&self, block: &Block) -> Result<Hash> {
        let hash = block.hash();
        self.storage.blocks().insert(&hash.0[..], block.encode()?)?;
        Ok(hash)
    }

    /// Get a block by its hash.
    pub fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        match self.storage.blocks().get(&hash.0[..])? {
            Some(bytes) => Ok(Some(Block::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check if a block exists by hash.
    pub fn has_block(&self, hash: &Hash) -> Result<bool> {
        Ok(self.storage.blocks().contains_key(&hash.0[..])?)
    }

    /// Number of stored blocks.
    pub fn block_count(&self) -> usize {
        self.storage.blocks().len()
    }

    // =========================================================================
    // Chain Metadata
    // =========================================================================

    /// Get the chain metadata, if the chain has been initialized.
    pub fn get_meta(&self) -> Result<Option<ChainMeta>> {
        match self.storage.meta().get(META_KEY)? {
            Some(bytes) => Ok(Some(ChainMeta::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the chain metadata, outside any transaction.
    pub fn put_meta(&self, meta: &ChainMeta) -> Result<()> {
        self.storage.meta().insert(META_KEY, meta.encode()?)?;
        Ok(())
    }

    // =========================================================================
    // Transactions & Reset
    // =========================================================================

    /// Run `f` atomically over the block and metadata trees.
    ///
    /// If `f` returns an error nothing it wrote becomes visible. sled may
    /// run `f` more than once on conflict, so it must not have side effects
    /// outside the transaction.
    ///
    /// The database is flushed after commit. A failed flush does not undo
    /// the commit, so it is logged and the committed value is still returned.
    pub fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: Fn(&ChainTx<'_>) -> TxResult<T, E>,
        E: From<StorageError>,
    {
        let result = (self.storage.blocks(), self.storage.meta())
            .transaction(|(blocks, meta)| f(&ChainTx { blocks, meta }));

        let value = result.map_err(|err| match err {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => E::from(StorageError::Database(err)),
        })?;

        if let Err(err) = self.storage.flush() {
            warn!(error = %err, "flush after commit failed");
        }
        Ok(value)
    }

    /// Remove every block and the metadata record.
    ///
    /// Only chain (re)initialization calls this. Metadata goes first and is
    /// flushed on its own, so an interrupted reset reads as "no chain"
    /// rather than as a tip pointing at a deleted block.
    pub fn reset(&self) -> Result<()> {
        let dropped = self.block_count();
        self.storage.meta().clear()?;
        self.storage.flush()?;
        self.storage.blocks().clear()?;
        self.storage.flush()?;

        if dropped > 0 {
            info!(blocks = dropped, "chain store reset");
        } else {
            debug!("chain store reset (was empty)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::BlockHeader;

    fn setup() -> Storage {
        Storage::open_temporary().unwrap()
    }

    fn child_of(parent: &Hash) -> Block {
        Block::new(BlockHeader::new(*parent, 0))
    }

    #[test]
    fn test_block_by_hash() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        let genesis = Block::genesis(8);
        let hash = chain.put_block(&genesis).unwrap();

        assert_eq!(hash, genesis.hash());
        let retrieved = chain.get_block(&hash).unwrap().unwrap();
        assert_eq!(retrieved, genesis);
        assert_eq!(retrieved.hash(), hash);
    }

    #[test]
    fn test_missing_block() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        assert!(chain.get_block(&Hash([7; 32])).unwrap().is_none());
        assert!(!chain.has_block(&Hash([7; 32])).unwrap());
    }

    #[test]
    fn test_has_block() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        let genesis = Block::genesis(8);
        let hash = genesis.hash();

        assert!(!chain.has_block(&hash).unwrap());
        chain.put_block(&genesis).unwrap();
        assert!(chain.has_block(&hash).unwrap());
        assert!(!chain.has_block(&Hash::ZERO).unwrap());
    }

    #[test]
    fn test_meta_roundtrip() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        assert!(chain.get_meta().unwrap().is_none());

        let meta = ChainMeta::new(Hash([3; 32]), 12);
        chain.put_meta(&meta).unwrap();
        assert_eq!(chain.get_meta().unwrap(), Some(meta));

        let moved = meta.with_tip(Hash([4; 32]));
        assert_eq!(moved.difficulty, 12);
        assert_eq!(moved.tip, Hash([4; 32]));
    }

    #[test]
    fn test_meta_unknown_version_rejected() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        let mut meta = ChainMeta::new(Hash::ZERO, 8);
        meta.version = 7;
        storage
            .meta()
            .insert(META_KEY, bincode::serialize(&meta).unwrap())
            .unwrap();

        let result = chain.get_meta();
        assert!(matches!(result, Err(StorageError::UnsupportedMetaVersion(7))));
    }

    #[test]
    fn test_transaction_commits_block_and_meta_together() {
        let storage = setup();
        let chain = ChainStore::new(&storage);
        let genesis = Block::genesis(8);

        let result: Result<Hash> = chain.transaction(|tx| {
            let hash = tx.put_block(&genesis)?;
            tx.put_meta(&ChainMeta::new(hash, 8))?;
            Ok(hash)
        });
        let hash = result.unwrap();

        assert_eq!(chain.get_meta().unwrap().unwrap().tip, hash);
        assert!(chain.has_block(&hash).unwrap());
    }

    #[test]
    fn test_transaction_reads_own_writes() {
        let storage = setup();
        let chain = ChainStore::new(&storage);
        let genesis = Block::genesis(8);

        let result: Result<(Option<Block>, Option<ChainMeta>)> = chain.transaction(|tx| {
            let hash = tx.put_block(&genesis)?;
            tx.put_meta(&ChainMeta::new(hash, 8))?;
            let block = tx.get_block(&hash)?;
            let meta = tx.get_meta()?;
            Ok((block, meta))
        });
        let seen = result.unwrap();

        assert_eq!(seen.0, Some(genesis.clone()));
        assert_eq!(seen.1.map(|m| m.tip), Some(genesis.hash()));
    }

    #[derive(Debug)]
    enum TestError {
        Storage(StorageError),
        Rejected,
    }

    impl From<StorageError> for TestError {
        fn from(err: StorageError) -> Self {
            Self::Storage(err)
        }
    }

    #[test]
    fn test_aborted_transaction_writes_nothing() {
        let storage = setup();
        let chain = ChainStore::new(&storage);
        let genesis = Block::genesis(8);

        let result: std::result::Result<(), TestError> = chain.transaction(|tx| {
            let hash = tx.put_block(&genesis)?;
            tx.put_meta(&ChainMeta::new(hash, 8))?;
            Err(TxError::Abort(TestError::Rejected))
        });

        assert!(matches!(result, Err(TestError::Rejected)));
        assert_eq!(chain.block_count(), 0);
        assert!(chain.get_meta().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_record_aborts_transaction() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        let hash = Hash([9; 32]);
        storage.blocks().insert(&hash.0[..], vec![1, 2, 3]).unwrap();

        let result: std::result::Result<Option<Block>, TestError> =
            chain.transaction(|tx| tx.get_block(&hash));
        assert!(matches!(
            result,
            Err(TestError::Storage(StorageError::Codec(_)))
        ));
    }

    #[test]
    fn test_reset_clears_everything() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        let genesis = Block::genesis(8);
        let hash = chain.put_block(&genesis).unwrap();
        chain.put_block(&child_of(&hash)).unwrap();
        chain.put_meta(&ChainMeta::new(hash, 8)).unwrap();
        assert_eq!(chain.block_count(), 2);

        chain.reset().unwrap();

        assert_eq!(chain.block_count(), 0);
        assert!(chain.get_meta().unwrap().is_none());
    }

    #[test]
    fn test_interrupted_reset_reads_as_empty() {
        let storage = setup();
        let chain = ChainStore::new(&storage);

        let genesis = Block::genesis(8);
        let hash = chain.put_block(&genesis).unwrap();
        chain.put_meta(&ChainMeta::new(hash, 8)).unwrap();

        // State after the first step of reset: metadata gone, blocks left
        storage.meta().clear().unwrap();

        assert!(chain.get_meta().unwrap().is_none());
        assert!(chain.has_block(&hash).unwrap());

        // Finishing the reset from there clears the rest
        chain.reset().unwrap();
        assert_eq!(chain.block_count(), 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let genesis = Block::genesis(8);

        {
            let storage = Storage::open(dir.path()).unwrap();
            let chain = ChainStore::new(&storage);
            let result: Result<()> = chain.transaction(|tx| {
                let hash = tx.put_block(&genesis)?;
                tx.put_meta(&ChainMeta::new(hash, 8))
            });
            result.unwrap();
        }

        let storage = Storage::open(dir.path()).unwrap();
        let chain = ChainStore::new(&storage);
        let meta = chain.get_meta().unwrap().unwrap();
        assert_eq!(meta.tip, genesis.hash());
        assert_eq!(chain.get_block(&meta.tip).unwrap(), Some(genesis));
    }
}
