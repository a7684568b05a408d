//! Random Bernoulli masks up to a budget of distinct experiments.

use crate::doe::{DeletionMask, DoeStrategy, ExperimentQueue};
use crate::error::Error;
use crate::factor::FactorSpace;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Consecutive draws that add no new distinct mask before population stops.
/// Without this bound the loop never terminates once the distinct-mask space
/// is smaller than the budget.
const STALL_LIMIT: usize = 1000;

/// Draws an independent Bernoulli(threshold) bit per unit and enqueues the
/// resulting mask until the queue holds `budget` distinct masks.
///
/// When no threshold is given, it defaults to `1 / size`, so the expected
/// number of deleted units per draw is one.
#[derive(Debug)]
pub struct Random {
    threshold: Option<f64>,
    budget: usize,
    rng: StdRng,
}

impl Random {
    pub fn new(threshold: Option<f64>, budget: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Random {
            threshold,
            budget,
            rng,
        }
    }
}

impl DoeStrategy for Random {
    fn populate(
        &mut self,
        space: &dyn FactorSpace,
        queue: &mut ExperimentQueue,
    ) -> Result<(), Error> {
        let size = space.size();
        if size == 0 {
            return Err(Error::configuration("random strategy over an empty catalog"));
        }
        let threshold = self.threshold.unwrap_or_else(|| {
            let default = 1.0 / size as f64;
            info!("using default random threshold 1/{size} = {default}");
            default
        });

        queue.add(DeletionMask::zeros(size), space);
        let mut stalled = 0;
        while queue.len() < self.budget {
            let bits = (0..size)
                .map(|_| self.rng.random::<f64>() < threshold)
                .collect();
            let before = queue.len();
            queue.add(DeletionMask::from_bits(bits), space);
            if queue.len() == before {
                stalled += 1;
                if stalled >= STALL_LIMIT {
                    warn!(
                        "random strategy stalled after {STALL_LIMIT} duplicate draws; \
                         stopping at {} of {} distinct masks",
                        queue.len(),
                        self.budget
                    );
                    break;
                }
            } else {
                stalled = 0;
            }
        }
        Ok(())
    }
}
