//! The "coin" flipped at the end of an undecided round (spec.md §4.1 step
//! 9, §9). The reference behavior is a deterministic parity coin; a true
//! random coin is offered as a drop-in alternative since spec.md says its
//! scenarios tolerate either (REDESIGN FLAGS, SPEC_FULL.md).

use crate::value::Value;

/// Produces the next proposal when a round's Phase-P tally is split.
pub trait Coin: Send + Sync {
    fn flip(&self, round: u64) -> Value;
}

/// `x <- (k mod 2)`: odd rounds flip to 1, even rounds to 0. The default,
/// matching the reference source described in spec.md §9.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParityCoin;

impl Coin for ParityCoin {
    fn flip(&self, round: u64) -> Value {
        Value::parity_coin(round)
    }
}

/// A true random coin, using the classical Ben-Or construction. Available
/// for callers who want the probabilistic termination argument spec.md §9
/// says the parity coin forfeits.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCoin;

impl Coin for RandomCoin {
    fn flip(&self, _round: u64) -> Value {
        if rand::random::<bool>() {
            Value::One
        } else {
            Value::Zero
        }
    }
}
