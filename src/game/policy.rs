//! Action sources for non-interactive (CPU) fighters
//!
//! Policies only look at the turn index, never at live vitals, so a CPU
//! opponent replays identically for the same match length.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::action::Action;

/// Deterministic action source keyed by turn index
pub trait OpponentPolicy: Send + Sync {
    fn action_for(&self, turn_index: u32) -> Action;

    /// Actions for both input beats of `turn_index`
    fn beats_for(&self, turn_index: u32) -> [Action; 2] {
        [
            self.action_for(turn_index),
            self.action_for(turn_index.saturating_add(1)),
        ]
    }
}

/// Walks a fixed table, wrapping around at the end
#[derive(Debug, Clone)]
pub struct CyclicPolicy {
    table: Vec<Action>,
}

impl CyclicPolicy {
    pub const DEFAULT_CYCLE: [Action; 6] = [
        Action::None,
        Action::Charge,
        Action::Block,
        Action::Attack,
        Action::Teleport,
        Action::Beam,
    ];

    pub fn new(table: Vec<Action>) -> Self {
        Self { table }
    }
}

impl Default for CyclicPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CYCLE.to_vec())
    }
}

impl OpponentPolicy for CyclicPolicy {
    fn action_for(&self, turn_index: u32) -> Action {
        if self.table.is_empty() {
            return Action::None;
        }
        self.table[turn_index as usize % self.table.len()]
    }
}

/// Pseudo-random pick that is still a pure function of `(seed, turn_index)`
#[derive(Debug, Clone, Copy)]
pub struct SeededPolicy {
    seed: u64,
}

impl SeededPolicy {
    const CHOICES: [Action; 5] = [
        Action::Charge,
        Action::Block,
        Action::Attack,
        Action::Teleport,
        Action::Beam,
    ];

    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl OpponentPolicy for SeededPolicy {
    fn action_for(&self, turn_index: u32) -> Action {
        let key = self.seed ^ u64::from(turn_index).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let mut rng = ChaCha8Rng::seed_from_u64(key);
        Self::CHOICES[rng.gen_range(0..Self::CHOICES.len())]
    }
}
