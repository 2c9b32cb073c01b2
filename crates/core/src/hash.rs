//! Block identity.
//!
//! A block is identified by the Blake3 digest of its canonical header
//! bytes. The same 32 bytes are the block's key in storage and its
//! parent's reference in the next header, so they must never be reordered
//! or re-encoded on the way to disk.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw 256-bit digest, most significant byte first.
pub type H256 = [u8; 32];

/// A header digest.
///
/// [`Hash::ZERO`] is reserved: a header whose `prev_hash` is zero has no
/// predecessor, which makes it the genesis block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub H256);

impl Hash {
    /// The "no predecessor" marker.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Big-endian digest bytes, as stored and as compared against a target.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Number of leading zero bits, i.e. the highest difficulty this hash
    /// would satisfy.
    pub fn leading_zero_bits(&self) -> u32 {
        let mut bits = 0;
        for byte in &self.0 {
            if *byte != 0 {
                return bits + byte.leading_zeros();
            }
            bits += 8;
        }
        bits
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse 64 hex digits, with or without a `0x` prefix (as printed by
    /// `Display`).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash(0x{})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

/// Blake3 digest of `data`.
pub fn hash(data: &[u8]) -> Hash {
    Hash(blake3::hash(data).into())
}
