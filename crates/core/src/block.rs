//! Block and block header structures.

use crate::hash::{hash, Hash};
use crate::pow::is_satisfied;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// The only block format version currently defined.
pub const BLOCK_VERSION_1: u8 = 1;

/// Length of the canonical header encoding that gets hashed.
pub const HEADER_LEN: usize = 1 + 32 + 4 + 4 + 4;

/// Errors from encoding or decoding a stored block.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("unsupported block version {0}")]
    UnsupportedVersion(u8),
}

/// The header of a block. Its hash is the block's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Format version.
    pub version: u8,
    /// Hash of the previous block ([`Hash::ZERO`] for genesis).
    pub prev_hash: Hash,
    /// Unix timestamp in seconds, fixed at construction.
    pub timestamp: u32,
    /// Number of leading zero bits the header hash must have.
    pub difficulty: u32,
    /// Searched by the miner; the only field that changes after construction.
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a header on top of `prev_hash`, stamped with the current time.
    pub fn new(prev_hash: Hash, difficulty: u32) -> Self {
        Self::new_at(prev_hash, difficulty, Self::current_timestamp())
    }

    /// Create a header with an explicit timestamp.
    pub fn new_at(prev_hash: Hash, difficulty: u32, timestamp: u32) -> Self {
        Self {
            version: BLOCK_VERSION_1,
            prev_hash,
            timestamp,
            difficulty,
            nonce: 0,
        }
    }

    /// Canonical encoding used for hashing.
    ///
    /// Field order is fixed: version, prev_hash, timestamp, difficulty, nonce.
    /// Integers are big-endian. Reordering changes every hash on the chain.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0] = self.version;
        bytes[1..33].copy_from_slice(self.prev_hash.as_bytes());
        bytes[33..37].copy_from_slice(&self.timestamp.to_be_bytes());
        bytes[37..41].copy_from_slice(&self.difficulty.to_be_bytes());
        bytes[41..45].copy_from_slice(&self.nonce.to_be_bytes());
        bytes
    }

    /// Calculate the hash of this block header.
    ///
    /// Always recomputed, so a nonce change is reflected immediately.
    pub fn hash(&self) -> Hash {
        hash(&self.to_bytes())
    }

    /// Get the current Unix timestamp in seconds.
    pub fn current_timestamp() -> u32 {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

/// A block: a header plus the behaviour derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Block header.
    pub header: BlockHeader,
}

impl Block {
    /// Wrap a header.
    pub fn new(header: BlockHeader) -> Self {
        Self { header }
    }

    /// Create a genesis block (no predecessor).
    pub fn genesis(difficulty: u32) -> Self {
        Self::new(BlockHeader::new(Hash::ZERO, difficulty))
    }

    /// Get the block hash (hash of the header).
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Hash of the previous block.
    pub fn prev_hash(&self) -> &Hash {
        &self.header.prev_hash
    }

    /// Difficulty the block was mined at.
    pub fn difficulty(&self) -> u32 {
        self.header.difficulty
    }

    /// Check if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.header.prev_hash.is_zero()
    }

    /// A block is valid if it is the genesis block or its header hash
    /// meets the target for its own difficulty.
    ///
    /// This does not check that the parent exists.
    pub fn is_valid(&self) -> bool {
        self.is_genesis() || is_satisfied(&self.hash(), self.header.difficulty)
    }

    /// Encode for storage.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode a stored block, rejecting unknown versions.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let block: Self = bincode::deserialize(bytes)?;
        if block.header.version != BLOCK_VERSION_1 {
            return Err(CodecError::UnsupportedVersion(block.header.version));
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_header() {
        let prev = hash(b"parent");
        let header = BlockHeader::new(prev, 8);

        assert_eq!(header.version, BLOCK_VERSION_1);
        assert_eq!(header.prev_hash, prev);
        assert_eq!(header.difficulty, 8);
        assert_eq!(header.nonce, 0);
        assert!(header.timestamp > 0);
    }

    #[test]
    fn test_header_encoding_layout() {
        let header = BlockHeader {
            version: 1,
            prev_hash: Hash([0xAB; 32]),
            timestamp: 0x0102_0304,
            difficulty: 8,
            nonce: 0xDEAD_BEEF,
        };
        let bytes = header.to_bytes();

        assert_eq!(bytes.len(), 45);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..33], &[0xAB; 32]);
        assert_eq!(&bytes[33..37], &[1, 2, 3, 4]);
        assert_eq!(&bytes[37..41], &[0, 0, 0, 8]);
        assert_eq!(&bytes[41..45], &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_identical_headers_hash_identically() {
        let a = BlockHeader::new_at(Hash::ZERO, 8, 1_700_000_000);
        let b = BlockHeader::new_at(Hash::ZERO, 8, 1_700_000_000);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(Block::new(a).hash(), Block::new(b).hash());
    }

    #[test]
    fn test_nonce_change_changes_hash() {
        let mut header = BlockHeader::new_at(hash(b"parent"), 8, 1_700_000_000);
        let mut seen = HashSet::new();

        for nonce in 0..10_000u32 {
            header.nonce = nonce;
            seen.insert(header.hash());
        }

        assert_eq!(seen.len(), 10_000);
    }

    #[test]
    fn test_genesis_block() {
        let genesis = Block::genesis(8);

        assert!(genesis.is_genesis());
        assert_eq!(*genesis.prev_hash(), Hash::ZERO);
        assert_eq!(genesis.difficulty(), 8);
    }

    #[test]
    fn test_genesis_valid_at_unsatisfiable_difficulty() {
        let genesis = Block::genesis(256);
        assert!(genesis.is_valid());
    }

    #[test]
    fn test_non_genesis_validity() {
        // Difficulty 0 accepts any hash
        let easy = Block::new(BlockHeader::new(hash(b"parent"), 0));
        assert!(easy.is_valid());

        // Difficulty 256 accepts none
        let impossible = Block::new(BlockHeader::new(hash(b"parent"), 256));
        assert!(!impossible.is_valid());
    }

    #[test]
    fn test_encode_decode_preserves_hash() {
        let mut header = BlockHeader::new(hash(b"parent"), 8);
        header.nonce = 42;
        let block = Block::new(header);

        let bytes = block.encode().unwrap();
        let decoded = Block::decode(&bytes).unwrap();

        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut block = Block::genesis(8);
        block.header.version = 2;
        let bytes = block.encode().unwrap();

        let result = Block::decode(&bytes);
        assert!(matches!(result, Err(CodecError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = Block::decode(&[1, 2, 3]);
        assert!(matches!(result, Err(CodecError::Serialization(_))));
    }
}
