//! Lossy command link.

use crate::error::{SimError, SimResult};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Drops outbound commands with a fixed probability.
///
/// Loss is drawn from a seeded generator so a scenario replays identically
/// for a given seed.
#[derive(Debug, Clone)]
pub struct LossyLink {
    rng: ChaCha8Rng,
    drop_rate: f64,
    delivered: u64,
    dropped: u64,
}

impl LossyLink {
    /// Link dropping commands with probability `drop_rate`.
    pub fn new(seed: u64, drop_rate: f64) -> SimResult<Self> {
        if !(0.0..=1.0).contains(&drop_rate) {
            return Err(SimError::InvalidDropRate(drop_rate));
        }
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            drop_rate,
            delivered: 0,
            dropped: 0,
        })
    }

    /// A link that never drops anything.
    pub fn reliable() -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(0),
            drop_rate: 0.0,
            delivered: 0,
            dropped: 0,
        }
    }

    /// Decide the fate of one transmission. Returns whether it gets through.
    pub fn transmit(&mut self) -> bool {
        if self.drop_rate > 0.0 && self.rng.gen_bool(self.drop_rate) {
            self.dropped += 1;
            debug!("LossyLink: dropped transmission #{}", self.delivered + self.dropped);
            false
        } else {
            self.delivered += 1;
            true
        }
    }

    /// Transmissions that got through.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Transmissions lost.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reliable_link_delivers_everything() {
        let mut link = LossyLink::reliable();
        assert!((0..100).all(|_| link.transmit()));
        assert_eq!(link.dropped(), 0);
    }

    #[test]
    fn test_same_seed_same_losses() {
        let mut a = LossyLink::new(42, 0.5).expect("valid rate");
        let mut b = LossyLink::new(42, 0.5).expect("valid rate");
        let a: Vec<bool> = (0..64).map(|_| a.transmit()).collect();
        let b: Vec<bool> = (0..64).map(|_| b.transmit()).collect();
        assert_eq!(a, b);
        assert!(a.iter().any(|delivered| !delivered));
    }

    #[test]
    fn test_invalid_rate_rejected() {
        assert!(matches!(LossyLink::new(1, 1.5), Err(SimError::InvalidDropRate(_))));
    }
}
