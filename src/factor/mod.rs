//! Factor spaces: the addressable deletion units of a target program.
//!
//! A factor space fixes the ordered unit catalog for the lifetime of a run
//! and knows how to materialize a program variant from a deletion mask. Two
//! implementations share the capability set:
//!
//! - [`LineFactorSpace`]: units are raw source lines; no closure, no
//!   validity restrictions.
//! - [`TreeFactorSpace`]: units are statement nodes of the annotated parse
//!   tree; deleting a composite statement closes over everything nested in
//!   it, and masks touching declarations, literal initializations or return
//!   statements are rejected outright.

mod line;
mod tree;

#[cfg(test)]
mod tests;

pub use line::LineFactorSpace;
pub use tree::TreeFactorSpace;

use crate::doe::DeletionMask;
use crate::error::Error;
use log::debug;
use std::path::Path;

/// The capability set shared by all factor spaces.
pub trait FactorSpace {
    /// Number of units in the catalog; fixed for the lifetime of a run.
    fn size(&self) -> usize;

    /// Force the mask into closure consistency: if a composite unit is
    /// deleted, everything nested inside it is deleted too. Idempotent and
    /// monotonic; the identity for spaces without nesting.
    fn revise(&self, mask: &DeletionMask) -> DeletionMask {
        mask.clone()
    }

    /// Reject masks whose evaluation would be pointless. Invalid masks are
    /// filtered before enqueueing, they never reach evaluation.
    fn is_valid(&self, mask: &DeletionMask) -> bool {
        let _ = mask;
        true
    }

    /// Materialize the program variant selected by `mask` into `work_dir`.
    /// The directory is recreated from the original program, so repeated
    /// calls with the same mask produce the same bytes.
    fn create_variant(&self, mask: &DeletionMask, work_dir: &Path) -> Result<(), Error>;
}

/// Recreate `work_dir` as a copy of `orig_dir` and record the mask in a
/// `factor` file alongside the code.
pub(crate) fn prepare_work_dir(
    orig_dir: &Path,
    work_dir: &Path,
    mask: &DeletionMask,
) -> Result<(), Error> {
    if work_dir.exists() {
        std::fs::remove_dir_all(work_dir)?;
    }
    copy_dir(orig_dir, work_dir)?;
    std::fs::write(work_dir.join("factor"), mask.key())?;
    debug!("prepared work dir {}", work_dir.display());
    Ok(())
}

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
