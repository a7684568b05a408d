//! Design-of-experiments strategies over deletion masks.
//!
//! A strategy populates the [`ExperimentQueue`] with candidate
//! [`DeletionMask`]s drawn over a [`FactorSpace`](crate::factor::FactorSpace).
//! Every strategy emits the all-zero baseline mask first, then its own
//! candidates. The queue applies closure revision and deduplicates by
//! canonical key, recording how many times each distinct mask was proposed.
//!
//! # Strategies
//!
//! - [`OneHot`]: one mask per unit (size + 1 masks including the baseline).
//! - [`NHot`]: all combinations of 1..=max_n deleted units, validity-filtered.
//! - [`Random`]: independent Bernoulli draws per unit up to a budget of
//!   distinct masks.
//! - [`FractionalFactorial`]: incremental saturated two-level orthogonal
//!   design.

mod fractional;
mod n_hot;
mod one_hot;
mod random;


pub use fractional::FractionalFactorial;
pub use n_hot::NHot;
pub use one_hot::OneHot;
pub use random::Random;

use crate::error::Error;
use crate::factor::FactorSpace;
use std::collections::{HashMap, VecDeque};

/// A boolean deletion vector over the unit catalog: bit `i` set means unit
/// `i` is deleted in the variant. Never mutated after closure revision.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeletionMask(Vec<bool>);

impl DeletionMask {
    /// The all-zero ("no deletion") baseline mask.
    pub fn zeros(len: usize) -> Self {
        DeletionMask(vec![false; len])
    }

    pub fn from_bits(bits: Vec<bool>) -> Self {
        DeletionMask(bits)
    }

    /// Mask with exactly the given unit indices set.
    pub fn with_set_bits(len: usize, set: &[usize]) -> Self {
        let mut bits = vec![false; len];
        for i in set {
            bits[*i] = true;
        }
        DeletionMask(bits)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bit(&self, i: usize) -> bool {
        self.0[i]
    }

    pub fn set(&mut self, i: usize) {
        self.0[i] = true;
    }

    pub fn bits(&self) -> &[bool] {
        &self.0
    }

    /// Indices of all set bits, ascending.
    pub fn set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.then_some(i))
    }

    /// Canonical key: one '0'/'1' character per bit. Two masks with the same
    /// key are the same experiment.
    pub fn key(&self) -> String {
        self.0.iter().map(|b| if *b { '1' } else { '0' }).collect()
    }

    /// Inverse of [`DeletionMask::key`].
    pub fn from_key(key: &str) -> Option<Self> {
        key.chars()
            .map(|c| match c {
                '0' => Some(false),
                '1' => Some(true),
                _ => None,
            })
            .collect::<Option<Vec<bool>>>()
            .map(DeletionMask)
    }
}

impl std::fmt::Display for DeletionMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// FIFO of distinct (post-revision) deletion masks with per-key repeat
/// counters. The counter records provenance (how many times a mask was
/// proposed) and never causes re-enqueueing.
#[derive(Debug, Default)]
pub struct ExperimentQueue {
    queue: VecDeque<DeletionMask>,
    counters: HashMap<String, u64>,
}

impl ExperimentQueue {
    pub fn new() -> Self {
        ExperimentQueue::default()
    }

    /// Propose a mask: revise it against the factor space, then enqueue if
    /// its key is unseen, otherwise bump the existing counter.
    pub fn add(&mut self, mask: DeletionMask, space: &dyn FactorSpace) {
        let revised = space.revise(&mask);
        let key = revised.key();
        match self.counters.get_mut(&key) {
            Some(count) => *count += 1,
            None => {
                self.counters.insert(key, 1);
                self.queue.push_back(revised);
            }
        }
    }

    /// Re-insert a mask from a persisted plan with its saved counter. Plans
    /// store post-revision masks, so no revision happens here.
    pub fn restore(&mut self, mask: DeletionMask, count: u64) {
        let key = mask.key();
        match self.counters.get_mut(&key) {
            Some(existing) => *existing += count,
            None => {
                self.counters.insert(key, count);
                self.queue.push_back(mask);
            }
        }
    }

    pub fn pop(&mut self) -> Option<DeletionMask> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Repeat counter of a mask's key (0 if never proposed).
    pub fn count_of(&self, mask: &DeletionMask) -> u64 {
        self.counters.get(&mask.key()).copied().unwrap_or(0)
    }

    /// Remaining masks in queue order, paired with their repeat counters.
    pub fn remaining(&self) -> impl Iterator<Item = (&DeletionMask, u64)> {
        self.queue
            .iter()
            .map(|mask| (mask, self.counters.get(&mask.key()).copied().unwrap_or(1)))
    }
}

/// A deletion-mask generation strategy.
///
/// `populate` fills the queue in one shot; strategies hold their own
/// parameters (budget, thresholds, seed) and are pure apart from seeded
/// randomness.
pub trait DoeStrategy {
    fn populate(
        &mut self,
        space: &dyn FactorSpace,
        queue: &mut ExperimentQueue,
    ) -> Result<(), Error>;
}
