//! Line-level factor space: every source line is a unit.

use crate::doe::DeletionMask;
use crate::error::Error;
use crate::factor::{FactorSpace, prepare_work_dir};
use log::debug;
use std::path::{Path, PathBuf};

/// Units are the raw lines (line terminator included) of all target files in
/// file order. A deleted line is replaced by a bare newline, so line numbers
/// of the surviving code do not shift.
pub struct LineFactorSpace {
    orig_dir: PathBuf,
    files: Vec<String>,
    /// `(file index, raw line)` per unit, in catalog order.
    units: Vec<(usize, String)>,
}

impl LineFactorSpace {
    pub fn new(orig_dir: &Path, files: &[String]) -> Result<Self, Error> {
        let mut units = Vec::new();
        for (file_idx, filename) in files.iter().enumerate() {
            let path = orig_dir.join(filename);
            let content = std::fs::read_to_string(&path).map_err(|e| {
                Error::configuration(format!("cannot read target file {}: {e}", path.display()))
            })?;
            for line in content.split_inclusive('\n') {
                units.push((file_idx, line.to_string()));
            }
        }
        debug!("line factor space: {} units", units.len());
        Ok(LineFactorSpace {
            orig_dir: orig_dir.to_path_buf(),
            files: files.to_vec(),
            units,
        })
    }
}

impl FactorSpace for LineFactorSpace {
    fn size(&self) -> usize {
        self.units.len()
    }

    fn create_variant(&self, mask: &DeletionMask, work_dir: &Path) -> Result<(), Error> {
        debug_assert_eq!(mask.len(), self.units.len());
        prepare_work_dir(&self.orig_dir, work_dir, mask)?;
        for (file_idx, filename) in self.files.iter().enumerate() {
            let mut content = String::new();
            for (unit_idx, (unit_file, line)) in self.units.iter().enumerate() {
                if *unit_file != file_idx {
                    continue;
                }
                if mask.bit(unit_idx) {
                    content.push('\n');
                } else {
                    content.push_str(line);
                }
            }
            std::fs::write(work_dir.join(filename), content)?;
        }
        Ok(())
    }
}
