//! Nonce search.
//!
//! The miner walks the nonce upward from the header's current value,
//! rehashing the header each step, until the hash meets the target, the
//! nonce space runs out, or the search is cancelled.

use powchain_core::{target, BlockHeader, Hash};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// How many nonces are tried between checks of the stop flag and deadline.
pub const CANCEL_POLL_INTERVAL: u32 = 4096;

/// Why a search stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The stop signal was raised.
    Stopped,
    /// The configured timeout elapsed.
    TimedOut,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stop signal"),
            Self::TimedOut => write!(f, "timeout"),
        }
    }
}

/// Errors that end a mining search without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("nonce space exhausted (tried {start}..={max_nonce})")]
    Exhausted { start: u32, max_nonce: u32 },

    #[error("mining cancelled by {reason} at nonce {nonce}")]
    Cancelled { reason: CancelReason, nonce: u32 },
}

/// Miner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerConfig {
    /// Highest nonce to try (inclusive).
    pub max_nonce: u32,
    /// Give up after this long.
    pub timeout: Option<Duration>,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            max_nonce: u32::MAX,
            timeout: None,
        }
    }
}

/// Block miner.
#[derive(Debug, Clone)]
pub struct Miner {
    config: MinerConfig,
    /// Stop signal
    stop_signal: Arc<AtomicBool>,
}

impl Miner {
    /// Create a new miner
    pub fn new(config: MinerConfig) -> Self {
        Self {
            config,
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Get a stop signal handle
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Stop mining.
    ///
    /// The signal is sticky: the running search and every later one are
    /// cancelled until [`Self::reset`] is called.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Reset stop signal
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    /// Search for a nonce whose header hash meets the header's difficulty.
    ///
    /// On success the winning nonce is left in `header` and returned. On
    /// failure `header.nonce` holds the last nonce tried.
    pub fn mine(&self, header: &mut BlockHeader) -> Result<u32, MiningError> {
        let target = target(header.difficulty);
        let deadline = self.config.timeout.map(|t| Instant::now() + t);
        let start = header.nonce;
        let max_nonce = self.config.max_nonce;

        debug!(
            prev = %header.prev_hash,
            difficulty = header.difficulty,
            start,
            max_nonce,
            "mining started"
        );

        for nonce in start..=max_nonce {
            if nonce.wrapping_sub(start) % CANCEL_POLL_INTERVAL == 0 {
                if let Some(reason) = self.cancel_reason(deadline) {
                    warn!(nonce, %reason, "mining cancelled");
                    return Err(MiningError::Cancelled { reason, nonce });
                }
            }

            header.nonce = nonce;
            let hash: Hash = header.hash();
            if target.is_met_by(&hash) {
                debug!(nonce, hash = %hash, tried = u64::from(nonce - start) + 1, "nonce found");
                return Ok(nonce);
            }
        }

        Err(MiningError::Exhausted { start, max_nonce })
    }

    fn cancel_reason(&self, deadline: Option<Instant>) -> Option<CancelReason> {
        if self.stop_signal.load(Ordering::SeqCst) {
            return Some(CancelReason::Stopped);
        }
        match deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::TimedOut),
            _ => None,
        }
    }
}

impl Default for Miner {
    fn default() -> Self {
        Self::new(MinerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::{hash, is_satisfied};

    fn header(difficulty: u32) -> BlockHeader {
        BlockHeader::new_at(hash(b"parent"), difficulty, 1_700_000_000)
    }

    #[test]
    fn test_mine_finds_satisfying_nonce() {
        let miner = Miner::default();
        let mut header = header(8);

        let nonce = miner.mine(&mut header).unwrap();

        assert_eq!(header.nonce, nonce);
        assert!(is_satisfied(&header.hash(), 8));
    }

    #[test]
    fn test_mine_is_deterministic() {
        let miner = Miner::default();
        let mut a = header(8);
        let mut b = header(8);

        assert_eq!(miner.mine(&mut a).unwrap(), miner.mine(&mut b).unwrap());
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_difficulty_zero_takes_first_nonce() {
        let miner = Miner::default();
        let mut header = header(0);

        assert_eq!(miner.mine(&mut header).unwrap(), 0);
    }

    #[test]
    fn test_mine_starts_from_current_nonce() {
        let miner = Miner::default();
        let mut header = header(0);
        header.nonce = 77;

        assert_eq!(miner.mine(&mut header).unwrap(), 77);
    }

    #[test]
    fn test_mine_exhausts_reduced_nonce_space() {
        let miner = Miner::new(MinerConfig {
            max_nonce: 1_000,
            timeout: None,
        });
        let mut header = header(255);

        let result = miner.mine(&mut header);
        assert_eq!(
            result,
            Err(MiningError::Exhausted {
                start: 0,
                max_nonce: 1_000
            })
        );
    }

    #[test]
    fn test_unsatisfiable_difficulty_exhausts() {
        let miner = Miner::new(MinerConfig {
            max_nonce: 100,
            timeout: None,
        });
        let mut header = header(256);

        assert!(matches!(
            miner.mine(&mut header),
            Err(MiningError::Exhausted { .. })
        ));
    }

    #[test]
    fn test_stop_signal_cancels() {
        let miner = Miner::default();
        miner.stop();
        let mut header = header(255);

        let result = miner.mine(&mut header);
        assert_eq!(
            result,
            Err(MiningError::Cancelled {
                reason: CancelReason::Stopped,
                nonce: 0
            })
        );
    }

    #[test]
    fn test_stop_from_another_thread() {
        let miner = Miner::default();
        let signal = miner.stop_signal();

        let handle = std::thread::spawn(move || {
            let mut header = header(255);
            miner.mine(&mut header)
        });
        signal.store(true, Ordering::SeqCst);

        let result = handle.join().unwrap();
        assert!(matches!(
            result,
            Err(MiningError::Cancelled {
                reason: CancelReason::Stopped,
                ..
            })
        ));
    }

    #[test]
    fn test_timeout_cancels() {
        let miner = Miner::new(MinerConfig {
            max_nonce: u32::MAX,
            timeout: Some(Duration::ZERO),
        });
        let mut header = header(255);

        let result = miner.mine(&mut header);
        assert!(matches!(
            result,
            Err(MiningError::Cancelled {
                reason: CancelReason::TimedOut,
                ..
            })
        ));
    }

    #[test]
    fn test_miner_stop_signal() {
        let miner = Miner::default();
        let signal = miner.stop_signal();

        assert!(!signal.load(Ordering::SeqCst));

        miner.stop();
        assert!(signal.load(Ordering::SeqCst));

        miner.reset();
        assert!(!signal.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_is_sticky_until_reset() {
        let miner = Miner::default();
        miner.stop();

        for _ in 0..2 {
            let mut header = header(0);
            assert!(matches!(
                miner.mine(&mut header),
                Err(MiningError::Cancelled {
                    reason: CancelReason::Stopped,
                    ..
                })
            ));
        }

        miner.reset();
        let mut header = header(0);
        assert_eq!(miner.mine(&mut header), Ok(0));
    }
}
