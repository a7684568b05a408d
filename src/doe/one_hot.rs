//! One factor at a time: the baseline plus one mask per unit.

use crate::doe::{DeletionMask, DoeStrategy, ExperimentQueue};
use crate::error::Error;
use crate::factor::FactorSpace;
use log::debug;

/// Enqueues the baseline and, for every unit, the mask deleting exactly that
/// unit. Over a catalog of size S this proposes S + 1 masks.
#[derive(Debug, Default, Clone, Copy)]
pub struct OneHot;

impl DoeStrategy for OneHot {
    fn populate(
        &mut self,
        space: &dyn FactorSpace,
        queue: &mut ExperimentQueue,
    ) -> Result<(), Error> {
        let size = space.size();
        queue.add(DeletionMask::zeros(size), space);
        for unit in 0..size {
            queue.add(DeletionMask::with_set_bits(size, &[unit]), space);
        }
        debug!("one-hot populated queue with {} masks", queue.len());
        Ok(())
    }
}
