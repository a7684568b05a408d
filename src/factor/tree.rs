//! Statement-level factor space over annotated parse trees.

use crate::doe::DeletionMask;
use crate::error::Error;
use crate::factor::{FactorSpace, prepare_work_dir};
use crate::toolchain::Toolchain;
use crate::tree::correlate::AnnotatedSource;
use crate::tree::{Document, NodeId};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Units are statement nodes, cataloged per file in breadth-first order and
/// concatenated in file order. Construction reconciles every file through
/// the correlation layer and fails with a [`Error::Correlation`] if any
/// round-trip sanity check does; a corrupted catalog cannot be trusted for
/// any subsequent experiment.
pub struct TreeFactorSpace {
    orig_dir: PathBuf,
    files: Vec<String>,
    sources: Vec<AnnotatedSource>,
    /// Catalog offset of each file's first unit.
    offsets: Vec<usize>,
    size: usize,
    toolchain: Box<dyn Toolchain>,
}

impl TreeFactorSpace {
    pub fn new(
        orig_dir: &Path,
        files: &[String],
        marker_prefix: &str,
        toolchain: Box<dyn Toolchain>,
    ) -> Result<Self, Error> {
        let mut sources = Vec::with_capacity(files.len());
        let mut offsets = Vec::with_capacity(files.len());
        let mut size = 0;
        for filename in files {
            let source = AnnotatedSource::load(toolchain.as_ref(), orig_dir, filename, marker_prefix)?;
            offsets.push(size);
            size += source.size();
            sources.push(source);
        }
        info!("tree factor space: {size} statement units across {} file(s)", files.len());
        Ok(TreeFactorSpace {
            orig_dir: orig_dir.to_path_buf(),
            files: files.to_vec(),
            sources,
            offsets,
            size,
            toolchain,
        })
    }

    /// The file index and per-file unit index of catalog position `idx`.
    fn locate(&self, idx: usize) -> (usize, usize) {
        let file = match self.offsets.binary_search(&idx) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };
        (file, idx - self.offsets[file])
    }

    /// The slice of `mask` covering one file's units.
    fn file_slice<'m>(&self, mask: &'m DeletionMask, file: usize) -> &'m [bool] {
        let start = self.offsets[file];
        &mask.bits()[start..start + self.sources[file].size()]
    }

    fn unit_node(&self, idx: usize) -> (&AnnotatedSource, NodeId) {
        let (file, local) = self.locate(idx);
        let source = &self.sources[file];
        (source, source.catalog[local])
    }
}

impl FactorSpace for TreeFactorSpace {
    fn size(&self) -> usize {
        self.size
    }

    fn revise(&self, mask: &DeletionMask) -> DeletionMask {
        let mut revised = mask.clone();
        for idx in mask.set_bits() {
            let (file, local) = self.locate(idx);
            for nested in self.sources[file].nested_units(local) {
                revised.set(self.offsets[file] + nested);
            }
        }
        revised
    }

    fn is_valid(&self, mask: &DeletionMask) -> bool {
        mask.set_bits().all(|idx| {
            let (source, node) = self.unit_node(idx);
            !is_protected_unit(&source.doc, node)
        })
    }

    fn create_variant(&self, mask: &DeletionMask, work_dir: &Path) -> Result<(), Error> {
        debug_assert_eq!(mask.len(), self.size);
        prepare_work_dir(&self.orig_dir, work_dir, mask)?;
        for (file, filename) in self.files.iter().enumerate() {
            let sliced = self.sources[file].delete_units(self.file_slice(mask, file));
            let code = self.toolchain.render(&sliced)?;
            std::fs::write(work_dir.join(filename), &code)?;
            debug!("{filename}: rendered {} bytes", code.len());
        }
        Ok(())
    }
}

/// Statements whose deletion almost always yields a non-compilable or
/// semantically void variant; they are excluded from the search space
/// instead of wasting an evaluation.
fn is_protected_unit(doc: &Document, node: NodeId) -> bool {
    is_declaration(doc, node) || is_literal_initialization(doc, node) || is_return(doc, node)
}

fn is_declaration(doc: &Document, node: NodeId) -> bool {
    matches!(doc.node(node).tag.as_str(), "function_decl" | "decl_stmt")
}

/// An expression statement of the exact shape `name = literal`.
fn is_literal_initialization(doc: &Document, node: NodeId) -> bool {
    if doc.node(node).tag != "expr_stmt" {
        return false;
    }
    let Some(expr) = doc.find_path(node, &["expr"]) else {
        return false;
    };
    let children = &doc.node(expr).children;
    if children.len() != 3 {
        return false;
    }
    doc.node(children[0]).tag == "name"
        && doc.node(children[1]).tag == "operator"
        && doc.node(children[1]).text.as_deref() == Some("=")
        && doc.node(children[2]).tag == "literal"
}

fn is_return(doc: &Document, node: NodeId) -> bool {
    doc.node(node).tag == "return"
}
