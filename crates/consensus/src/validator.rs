//! Block validation rules.
//!
//! Validation is stateless: it looks only at the block itself and the
//! chain difficulty. Parent linkage is checked where blocks are appended.

use powchain_core::{is_satisfied, Block, Hash, BLOCK_VERSION_1};
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unsupported block version {0}")]
    UnsupportedVersion(u8),

    #[error("block hash {hash} does not meet difficulty {difficulty}")]
    InsufficientWork { hash: Hash, difficulty: u32 },

    #[error("block difficulty mismatch (expected {expected}, got {got})")]
    DifficultyMismatch { expected: u32, got: u32 },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Block validator.
pub struct BlockValidator;

impl BlockValidator {
    /// Validate a block on its own terms.
    ///
    /// Genesis is exempt from proof-of-work; every other block must meet
    /// the difficulty written in its own header.
    pub fn validate(block: &Block) -> Result<()> {
        if block.header.version != BLOCK_VERSION_1 {
            return Err(ValidationError::UnsupportedVersion(block.header.version));
        }

        if block.is_genesis() {
            return Ok(());
        }

        let hash = block.hash();
        if !is_satisfied(&hash, block.header.difficulty) {
            return Err(ValidationError::InsufficientWork {
                hash,
                difficulty: block.header.difficulty,
            });
        }

        Ok(())
    }

    /// Validate a block for a chain running at `difficulty`.
    ///
    /// A non-genesis block must also declare the chain's difficulty, so a
    /// header cannot lower its own bar.
    pub fn validate_for_chain(block: &Block, difficulty: u32) -> Result<()> {
        if !block.is_genesis() && block.header.difficulty != difficulty {
            return Err(ValidationError::DifficultyMismatch {
                expected: difficulty,
                got: block.header.difficulty,
            });
        }

        Self::validate(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::Miner;
    use powchain_core::{hash, BlockHeader};

    fn mined_block(difficulty: u32) -> Block {
        let mut header = BlockHeader::new(hash(b"parent"), difficulty);
        Miner::default().mine(&mut header).unwrap();
        Block::new(header)
    }

    /// Find a header that does NOT meet `difficulty`.
    fn unmined_block(difficulty: u32) -> Block {
        let mut header = BlockHeader::new(hash(b"parent"), difficulty);
        while is_satisfied(&header.hash(), difficulty) {
            header.nonce += 1;
        }
        Block::new(header)
    }

    #[test]
    fn test_mined_block_is_valid() {
        let block = mined_block(8);
        assert!(BlockValidator::validate(&block).is_ok());
        assert!(block.is_valid());
    }

    #[test]
    fn test_unmined_block_is_rejected() {
        let block = unmined_block(8);

        let result = BlockValidator::validate(&block);
        assert_eq!(
            result,
            Err(ValidationError::InsufficientWork {
                hash: block.hash(),
                difficulty: 8
            })
        );
        assert!(!block.is_valid());
    }

    #[test]
    fn test_genesis_exempt_from_work() {
        let genesis = Block::genesis(256);
        assert!(BlockValidator::validate(&genesis).is_ok());
        assert!(BlockValidator::validate_for_chain(&genesis, 8).is_ok());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut block = mined_block(0);
        block.header.version = 9;

        assert_eq!(
            BlockValidator::validate(&block),
            Err(ValidationError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn test_lowered_difficulty_rejected_for_chain() {
        // Valid on its own terms at difficulty 0, but the chain runs at 8
        let block = mined_block(0);
        assert!(BlockValidator::validate(&block).is_ok());

        let result = BlockValidator::validate_for_chain(&block, 8);
        assert_eq!(
            result,
            Err(ValidationError::DifficultyMismatch {
                expected: 8,
                got: 0
            })
        );
    }
}
