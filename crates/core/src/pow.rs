//! Proof-of-work target math.
//!
//! A difficulty `d` is the number of leading zero bits a header hash must
//! carry. The target is `1 << (256 - d)`, and a hash satisfies it when its
//! big-endian value is strictly below the target:
//!
//! ```text
//! d = 0    target = 2^256      every hash passes
//! d = 8    target = 2^248      first byte must be 0x00
//! d = 255  target = 2^1        only 0x00..00 and 0x00..01 pass
//! d = 256  target = 0          nothing passes
//! ```

use crate::hash::Hash;
use std::fmt;
use thiserror::Error;

/// Highest difficulty a chain may be configured with.
pub const MAX_DIFFICULTY: u32 = 255;

/// Difficulty configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DifficultyError {
    #[error("difficulty {difficulty} out of range (must be 0..={max})", max = MAX_DIFFICULTY)]
    OutOfRange { difficulty: u32 },
}

/// Check that a difficulty can be used to configure a chain.
///
/// Out-of-range values are rejected, never clamped.
pub fn validate_difficulty(difficulty: u32) -> Result<u32, DifficultyError> {
    if difficulty > MAX_DIFFICULTY {
        return Err(DifficultyError::OutOfRange { difficulty });
    }
    Ok(difficulty)
}

/// A proof-of-work target as a 257-bit big-endian integer.
///
/// One byte wider than a hash so that difficulty 0 can express `2^256`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Target([u8; 33]);

impl Target {
    /// Build the target `1 << (256 - difficulty)`.
    ///
    /// Any difficulty of 256 or more yields the zero target.
    pub fn from_difficulty(difficulty: u32) -> Self {
        let mut bytes = [0u8; 33];
        if difficulty < 256 {
            let bit = (256 - difficulty) as usize;
            bytes[32 - bit / 8] = 1 << (bit % 8);
        }
        Self(bytes)
    }

    /// Big-endian bytes of the target.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Whether the target is zero (unsatisfiable).
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 33]
    }

    /// Whether `hash`, read as a big-endian integer, is strictly below the target.
    pub fn is_met_by(&self, hash: &Hash) -> bool {
        let mut widened = [0u8; 33];
        widened[1..].copy_from_slice(hash.as_bytes());
        widened < self.0
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target(0x{})", hex::encode(self.0))
    }
}

/// The target for a difficulty.
pub fn target(difficulty: u32) -> Target {
    Target::from_difficulty(difficulty)
}

/// Whether a header hash satisfies the target for `difficulty`.
pub fn is_satisfied(hash: &Hash, difficulty: u32) -> bool {
    target(difficulty).is_met_by(hash)
}
