//! Outbound loss injection for testing and simulation.
//!
//! Real networks drop packets.  To exercise the retransmission path without
//! depending on actual network conditions, [`crate::transport::Transport`]
//! consults a [`LossModel`] before every outbound data datagram:
//!
//! | Model          | Behaviour                                             |
//! |----------------|-------------------------------------------------------|
//! | [`NoLoss`]     | Transparent pass-through.                             |
//! | [`RandomLoss`] | Drop with probability `loss_rate`, optionally seeded. |
//! | [`DropList`]   | Drop the first transmission of each listed sequence.  |
//!
//! Acknowledgments are never subject to loss injection.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Decides whether an outbound datagram is silently dropped.
pub trait LossModel: Send {
    /// Called once per transmission attempt of `seq`.
    fn should_drop(&mut self, seq: u32) -> bool;
}

/// Never drops anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLoss;

impl LossModel for NoLoss {
    fn should_drop(&mut self, _seq: u32) -> bool {
        false
    }
}

/// Independent Bernoulli loss with probability `loss_rate`.
#[derive(Debug)]
pub struct RandomLoss {
    loss_rate: f64,
    rng: StdRng,
}

impl RandomLoss {
    /// `loss_rate` is clamped into `[0.0, 1.0]` (NaN counts as 0).  Passing a
    /// `seed` makes the drop pattern reproducible; `None` seeds from OS entropy.
    pub fn new(loss_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let loss_rate = if loss_rate.is_nan() { 0.0 } else { loss_rate.clamp(0.0, 1.0) };
        Self { loss_rate, rng }
    }
}

impl LossModel for RandomLoss {
    fn should_drop(&mut self, _seq: u32) -> bool {
        self.rng.gen_bool(self.loss_rate)
    }
}

/// Deterministically drops the first transmission of each listed sequence
/// number; retransmissions of the same sequence go through.
#[derive(Debug, Default)]
pub struct DropList {
    pending: HashSet<u32>,
}

impl DropList {
    pub fn new(seqs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            pending: seqs.into_iter().collect(),
        }
    }
}

impl LossModel for DropList {
    fn should_drop(&mut self, seq: u32) -> bool {
        self.pending.remove(&seq)
    }
}

/// Pick the loss model described by a rate, seed and explicit drop list.
///
/// An explicit drop list takes precedence over the random rate.
pub fn from_settings(loss_rate: f64, seed: Option<u64>, drop_list: &[u32]) -> Box<dyn LossModel> {
    if !drop_list.is_empty() {
        Box::new(DropList::new(drop_list.iter().copied()))
    } else if loss_rate > 0.0 {
        Box::new(RandomLoss::new(loss_rate, seed))
    } else {
        Box::new(NoLoss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_loss_passes_everything() {
        let mut m = NoLoss;
        assert!((0..100).all(|seq| !m.should_drop(seq)));
    }

    #[test]
    fn full_loss_drops_everything() {
        let mut m = RandomLoss::new(1.0, Some(1));
        assert!((0..100).all(|seq| m.should_drop(seq)));
    }

    #[test]
    fn zero_rate_random_loss_never_drops() {
        let mut m = RandomLoss::new(0.0, Some(1));
        assert!((0..100).all(|seq| !m.should_drop(seq)));
    }

    #[test]
    fn seeded_loss_is_reproducible() {
        let mut a = RandomLoss::new(0.3, Some(42));
        let mut b = RandomLoss::new(0.3, Some(42));
        let pa: Vec<bool> = (0..64).map(|s| a.should_drop(s)).collect();
        let pb: Vec<bool> = (0..64).map(|s| b.should_drop(s)).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn out_of_range_rate_is_clamped() {
        let mut m = RandomLoss::new(7.5, None);
        assert!(m.should_drop(0));
    }

    #[test]
    fn drop_list_drops_first_transmission_only() {
        let mut m = DropList::new([2]);
        assert!(!m.should_drop(0));
        assert!(!m.should_drop(1));
        assert!(m.should_drop(2));
        assert!(!m.should_drop(3));
        // Retransmission of #2 goes through.
        assert!(!m.should_drop(2));
    }

    #[test]
    fn drop_list_wins_over_rate() {
        let mut m = from_settings(1.0, Some(3), &[5]);
        assert!(!m.should_drop(4));
        assert!(m.should_drop(5));
    }
}
