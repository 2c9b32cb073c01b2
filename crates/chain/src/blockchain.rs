//! Main blockchain orchestration.
//!
//! This module brings together mining, validation and storage. The
//! in-memory [`ChainState`] mirrors the persisted metadata and is only
//! updated after the store has committed.

use crate::config::BlockchainConfig;
use parking_lot::RwLock;
use powchain_consensus::{BlockValidator, Miner, MiningError, ValidationError};
use powchain_core::{validate_difficulty, Block, BlockHeader, DifficultyError, Hash};
use powchain_storage::{ChainMeta, ChainStore, ChainTx, Storage, StorageError, TxError, TxResult};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ways a persisted chain can fail its integrity walk.
#[derive(Debug, Error)]
pub enum CorruptChainError {
    #[error("block {hash} is missing ({depth} hops below the tip)")]
    MissingBlock { hash: Hash, depth: u64 },

    #[error("cycle detected: block {hash} reached twice")]
    Cycle { hash: Hash },

    #[error("record stored under {key} hashes to {actual}")]
    HashMismatch { key: Hash, actual: Hash },

    #[error("stored block {hash} is invalid: {source}")]
    InvalidBlock {
        hash: Hash,
        #[source]
        source: ValidationError,
    },
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Error)]
pub enum BlockchainError {
    #[error("invalid configuration: {0}")]
    Config(#[from] DifficultyError),

    #[error("mining failed: {0}")]
    Mining(#[from] MiningError),

    #[error("invalid block {hash}: {source}")]
    InvalidBlock {
        hash: Hash,
        #[source]
        source: ValidationError,
    },

    #[error("stale parent: block builds on {got} but the tip is {expected}")]
    StaleParent { expected: Hash, got: Hash },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("corrupt chain: {0}")]
    CorruptChain(#[from] CorruptChainError),

    #[error("no chain found in store (run init first)")]
    NoChain,
}

impl BlockchainError {
    /// True if re-mining on the new tip can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleParent { .. })
    }
}

pub type Result<T> = std::result::Result<T, BlockchainError>;

/// In-memory view of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainState {
    /// Hash of the most recently committed block.
    pub tip: Hash,
    /// Chain difficulty.
    pub difficulty: u32,
    /// Hops from the tip to genesis (0 for a genesis-only chain).
    pub height: u64,
}

/// Main blockchain struct that orchestrates all components.
pub struct Blockchain<'a> {
    /// Chain store for blocks and metadata.
    store: ChainStore<'a>,
    /// Nonce search.
    miner: Miner,
    /// Mirrors the committed metadata.
    state: RwLock<ChainState>,
}

impl<'a> Blockchain<'a> {
    /// Create a fresh chain, discarding anything already in the store.
    ///
    /// The metadata and the genesis block are written in one transaction,
    /// so a crash leaves either no chain or a complete genesis-only chain.
    pub fn initialize(storage: &'a Storage, config: BlockchainConfig) -> Result<Self> {
        let difficulty = validate_difficulty(config.difficulty)?;
        let store = ChainStore::new(storage);
        store.reset()?;

        let genesis = Block::genesis(difficulty);
        let tip = store.transaction(|tx| {
            tx.put_meta::<BlockchainError>(&ChainMeta::new(Hash::ZERO, difficulty))?;
            commit_block(tx, &genesis)
        })?;

        info!(genesis = %tip, difficulty, "chain initialized");

        Ok(Self {
            store,
            miner: Miner::new(config.miner),
            state: RwLock::new(ChainState {
                tip,
                difficulty,
                height: 0,
            }),
        })
    }

    /// Open an existing chain and verify it from tip to genesis.
    ///
    /// `config.difficulty` is ignored; the stored difficulty wins.
    pub fn load(storage: &'a Storage, config: BlockchainConfig) -> Result<Self> {
        let store = ChainStore::new(storage);
        let meta = store.get_meta()?.ok_or(BlockchainError::NoChain)?;
        let difficulty = validate_difficulty(meta.difficulty)?;

        let blocks = walk(&store, meta.tip, difficulty, usize::MAX)?;
        let height = blocks.len().saturating_sub(1) as u64;

        if config.difficulty != difficulty {
            debug!(
                configured = config.difficulty,
                stored = difficulty,
                "using stored difficulty"
            );
        }
        info!(tip = %meta.tip, height, difficulty, "chain loaded");

        Ok(Self {
            store,
            miner: Miner::new(config.miner),
            state: RwLock::new(ChainState {
                tip: meta.tip,
                difficulty,
                height,
            }),
        })
    }

    /// Build an unmined block on top of the current tip.
    pub fn new_candidate_block(&self) -> Block {
        let state = *self.state.read();
        Block::new(BlockHeader::new(state.tip, state.difficulty))
    }

    /// Mine a block on the current tip and commit it.
    ///
    /// Mining runs without holding any lock. If another block is committed
    /// meanwhile, this fails with [`BlockchainError::StaleParent`].
    pub fn mine_new_block(&self) -> Result<Block> {
        let mut block = self.new_candidate_block();
        let nonce = self.miner.mine(&mut block.header)?;
        debug!(nonce, hash = %block.hash(), "block mined");

        self.append_block(&block)?;
        Ok(block)
    }

    /// Validate a block and commit it as the new tip.
    ///
    /// On any error the store is unchanged. If the stored tip has moved
    /// past the in-memory one (another writer on the same store), the
    /// in-memory tip is brought up to date before `StaleParent` is returned,
    /// so mining again builds on the real tip.
    pub fn append_block(&self, block: &Block) -> Result<Hash> {
        let mut state = self.state.write();
        let hash = block.hash();

        BlockValidator::validate_for_chain(block, state.difficulty)
            .map_err(|source| BlockchainError::InvalidBlock { hash, source })?;

        if block.header.prev_hash != state.tip {
            warn!(
                hash = %hash,
                prev = %block.header.prev_hash,
                tip = %state.tip,
                "rejecting block with stale parent"
            );
            return Err(BlockchainError::StaleParent {
                expected: state.tip,
                got: block.header.prev_hash,
            });
        }

        let committed = match self.store.transaction(|tx| commit_block(tx, block)) {
            Ok(hash) => hash,
            Err(err @ BlockchainError::StaleParent { .. }) => {
                // Another writer moved the stored tip; follow it so a retry can land
                self.resync(&mut state)?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        state.tip = committed;
        state.height += 1;
        info!(hash = %committed, height = state.height, "block committed");

        Ok(committed)
    }

    /// Reload tip and height from the store.
    fn resync(&self, state: &mut ChainState) -> Result<()> {
        let meta = self.store.get_meta()?.ok_or(BlockchainError::NoChain)?;
        let blocks = walk(&self.store, meta.tip, state.difficulty, usize::MAX)?;

        warn!(stale = %state.tip, tip = %meta.tip, "in-memory tip behind the store, resynced");
        state.tip = meta.tip;
        state.height = blocks.len().saturating_sub(1) as u64;
        Ok(())
    }

    /// Hash of the most recently committed block.
    pub fn tip(&self) -> Hash {
        self.state.read().tip
    }

    /// Chain difficulty.
    pub fn difficulty(&self) -> u32 {
        self.state.read().difficulty
    }

    /// Current chain height.
    pub fn height(&self) -> u64 {
        self.state.read().height
    }

    /// Snapshot of the in-memory chain state.
    pub fn state(&self) -> ChainState {
        *self.state.read()
    }

    /// The miner used by [`Self::mine_new_block`]; use it to stop a search.
    ///
    /// The stop signal stays raised: every later `mine_new_block` fails with
    /// `Cancelled` until [`Miner::reset`] is called.
    pub fn miner(&self) -> &Miner {
        &self.miner
    }

    /// Get a block by hash.
    pub fn get_block(&self, hash: &Hash) -> Result<Option<Block>> {
        Ok(self.store.get_block(hash)?)
    }

    /// Get the latest block.
    pub fn get_latest_block(&self) -> Result<Block> {
        let tip = self.tip();
        self.get_block(&tip)?.ok_or_else(|| {
            CorruptChainError::MissingBlock {
                hash: tip,
                depth: 0,
            }
            .into()
        })
    }

    /// Every block from the tip back to genesis.
    pub fn blocks(&self) -> Result<Vec<Block>> {
        self.recent_blocks(usize::MAX)
    }

    /// Up to `count` blocks, tip first.
    pub fn recent_blocks(&self, count: usize) -> Result<Vec<Block>> {
        let state = self.state();
        walk(&self.store, state.tip, state.difficulty, count)
    }

    /// Get blockchain statistics.
    pub fn stats(&self) -> Result<BlockchainStats> {
        let state = self.state();
        let latest = self.get_latest_block()?;

        Ok(BlockchainStats {
            height: state.height,
            tip: state.tip,
            difficulty: state.difficulty,
            latest_timestamp: latest.header.timestamp,
            stored_blocks: self.store.block_count(),
        })
    }
}

/// Blockchain statistics.
#[derive(Debug, Clone)]
pub struct BlockchainStats {
    /// Current chain height.
    pub height: u64,
    /// Hash of the latest block.
    pub tip: Hash,
    /// Chain difficulty.
    pub difficulty: u32,
    /// Timestamp of the latest block.
    pub latest_timestamp: u32,
    /// Records in the block tree.
    pub stored_blocks: usize,
}

/// Commit `block` as the new tip inside a store transaction.
///
/// The stored tip is re-read here, so the write only lands if the block
/// still extends it.
fn commit_block(tx: &ChainTx<'_>, block: &Block) -> TxResult<Hash, BlockchainError> {
    let meta = tx
        .get_meta::<BlockchainError>()?
        .ok_or(TxError::Abort(BlockchainError::NoChain))?;
    let hash = block.hash();

    BlockValidator::validate_for_chain(block, meta.difficulty)
        .map_err(|source| TxError::Abort(BlockchainError::InvalidBlock { hash, source }))?;

    if block.header.prev_hash != meta.tip {
        return Err(TxError::Abort(BlockchainError::StaleParent {
            expected: meta.tip,
            got: block.header.prev_hash,
        }));
    }

    tx.put_block::<BlockchainError>(block)?;
    tx.put_meta::<BlockchainError>(&meta.with_tip(hash))?;
    Ok(hash)
}

/// Walk back from `tip` collecting at most `limit` blocks.
///
/// Every visited record is checked: it must exist, must not close a loop,
/// must hash to its key and must be valid at `difficulty`.
fn walk(store: &ChainStore<'_>, tip: Hash, difficulty: u32, limit: usize) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut visited = HashSet::new();
    let mut cursor = tip;
    visited.insert(cursor);

    while blocks.len() < limit {
        let depth = blocks.len() as u64;
        let block = store
            .get_block(&cursor)?
            .ok_or(CorruptChainError::MissingBlock {
                hash: cursor,
                depth,
            })?;

        let prev = block.header.prev_hash;
        if !block.is_genesis() && !visited.insert(prev) {
            return Err(CorruptChainError::Cycle { hash: prev }.into());
        }

        let actual = block.hash();
        if actual != cursor {
            return Err(CorruptChainError::HashMismatch {
                key: cursor,
                actual,
            }
            .into());
        }

        BlockValidator::validate_for_chain(&block, difficulty)
            .map_err(|source| CorruptChainError::InvalidBlock {
                hash: cursor,
                source,
            })?;

        debug!(hash = %cursor, depth, "walked block");
        blocks.push(block);

        if prev.is_zero() {
            break;
        }
        cursor = prev;
    }

    Ok(blocks)
}
