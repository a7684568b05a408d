//! All combinations of up to `max_n` simultaneously deleted units.

use crate::doe::{DeletionMask, DoeStrategy, ExperimentQueue};
use crate::error::Error;
use crate::factor::FactorSpace;
use log::debug;

/// Enumerates, for each k in 1..=max_n, every C(size, k) mask with exactly k
/// bits set, filtering out masks the factor space rejects as invalid.
#[derive(Debug, Clone, Copy)]
pub struct NHot {
    max_n: usize,
}

impl NHot {
    pub fn new(max_n: usize) -> Result<Self, Error> {
        if max_n == 0 {
            return Err(Error::configuration("n-hot requires max_n >= 1"));
        }
        Ok(NHot { max_n })
    }
}

impl DoeStrategy for NHot {
    fn populate(
        &mut self,
        space: &dyn FactorSpace,
        queue: &mut ExperimentQueue,
    ) -> Result<(), Error> {
        let size = space.size();
        queue.add(DeletionMask::zeros(size), space);
        for k in 1..=self.max_n.min(size) {
            for combination in Combinations::new(size, k) {
                let mask = DeletionMask::with_set_bits(size, &combination);
                if space.is_valid(&mask) {
                    queue.add(mask, space);
                }
            }
        }
        debug!(
            "n-hot (max_n={}) populated queue with {} masks",
            self.max_n,
            queue.len()
        );
        Ok(())
    }
}

/// Lexicographic k-combinations of `0..n`.
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Combinations {
            n,
            indices: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();
        let k = self.indices.len();
        // Advance to the next combination in lexicographic order.
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.indices[i] != i + self.n - k {
                self.indices[i] += 1;
                for j in i + 1..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                break;
            }
        }
        Some(current)
    }
}
