//! Core block primitives for powchain.
//!
//! This crate provides the fundamental types used throughout the chain:
//! - 32-byte hashes and the Blake3 digest
//! - Block headers and blocks, with their canonical encoding
//! - Proof-of-work target math and block validity

pub mod block;
pub mod hash;
pub mod pow;

// Re-export commonly used types at the crate root
pub use block::{Block, BlockHeader, CodecError, BLOCK_VERSION_1, HEADER_LEN};
pub use hash::{hash, Hash, H256};
pub use pow::{is_satisfied, target, validate_difficulty, DifficultyError, Target, MAX_DIFFICULTY};
