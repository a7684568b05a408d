//! Correlation of statement units across divergent views of one file.
//!
//! Each target file exists in two forms on disk: the instrumented file (with
//! embedded instrumentation markers) and its pristine `_original` sibling.
//! Building a unit catalog requires reconciling several trees derived from
//! these: the instrumented parse with positions, the same tree with markers
//! and/or positions stripped, and an independent parse of the reference file.
//!
//! Trees derived from one another by attribute-only or render-neutral edits
//! keep their breadth-first node order, which makes the ordinal position of
//! a node a portable address between them; see [`correlate`].

use crate::error::Error;
use crate::toolchain::Toolchain;
use crate::tree::mutate::delete_node;
use crate::tree::{Document, NodeId, POS_COLUMN, POS_ELEMENT, POS_LINE, Position, is_stmt_tag};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Find the node of `tree_a` that corresponds to `node_in_b` of `tree_b`.
///
/// # Precondition
///
/// `tree_a` and `tree_b` MUST be structurally isomorphic: same node count,
/// same breadth-first order. Callers guarantee this by only ever deriving one
/// tree from the other through attribute-only edits (stripping positions) or
/// render-checked marker removal, never through other structural edits.
///
/// A violated precondition does NOT fail loudly: it yields a wrong node or
/// `None`. Never call this after an unchecked structural edit.
pub fn correlate(tree_a: &Document, tree_b: &Document, node_in_b: NodeId) -> Option<NodeId> {
    let ordinal = tree_b.bfs_order().iter().position(|n| *n == node_in_b)?;
    tree_a.bfs_order().get(ordinal).copied()
}

/// True if `expr` is a call whose first literal argument carries the marker
/// prefix, the shape every instrumentation marker reduces to.
pub fn is_marker_call(doc: &Document, expr: NodeId, prefix: &str) -> bool {
    let Some(call) = doc.find_path(expr, &["call"]) else {
        return false;
    };
    if doc.find_path(call, &["name"]).is_none() {
        return false;
    }
    let Some(literal) = doc.find_path(call, &["argument_list", "argument", "expr", "literal"])
    else {
        return false;
    };
    doc.node(literal)
        .text
        .as_deref()
        .is_some_and(|text| text.starts_with(prefix))
}

/// True if `node` is a standalone marker: an `expr_stmt` wrapping a marker
/// call.
pub fn is_standalone_marker(doc: &Document, node: NodeId, prefix: &str) -> bool {
    if doc.node(node).tag != "expr_stmt" {
        return false;
    }
    doc.find_path(node, &["expr"])
        .is_some_and(|expr| is_marker_call(doc, expr, prefix))
}

/// True if `expr` is a ternary marker: an `expr` whose `ternary/then/expr`
/// is a marker call (the original expression survives in the condition).
pub fn is_ternary_marker(doc: &Document, expr: NodeId, prefix: &str) -> bool {
    if doc.node(expr).tag != "expr" {
        return false;
    }
    doc.find_path(expr, &["ternary", "then", "expr"])
        .is_some_and(|then_expr| is_marker_call(doc, then_expr, prefix))
}

/// The source position a standalone marker records about its target: the
/// second and third call arguments are line and column literals.
pub fn marker_target_position(doc: &Document, marker: NodeId) -> Option<Position> {
    let args = doc.find_path(marker, &["expr", "call", "argument_list"])?;
    let arg_nodes = doc.children_with_tag(args, "argument");
    let read = |arg: &NodeId| -> Option<u32> {
        let literal = doc.find_path(*arg, &["expr", "literal"])?;
        doc.node(literal).text.as_deref()?.trim().parse().ok()
    };
    Some(Position {
        line: read(arg_nodes.get(1)?)?,
        column: read(arg_nodes.get(2)?)?,
    })
}

/// Walk up from `node` (inclusive) to the smallest enclosing statement.
pub fn enclosing_stmt(
    doc: &Document,
    parent: &HashMap<NodeId, NodeId>,
    node: NodeId,
) -> Option<NodeId> {
    let mut current = node;
    while !is_stmt_tag(&doc.node(current).tag) {
        current = *parent.get(&current)?;
    }
    Some(current)
}

/// Remove position annotations: standalone `pos:position` elements are
/// detached outright and `pos:line`/`pos:column` attributes dropped. This is
/// render-neutral (position elements carry no source text) and, for the
/// purposes of [`correlate`], counts as a structural edit: correlate only
/// between trees stripped the same way.
pub fn strip_positions(doc: &mut Document) {
    let order = doc.bfs_order();
    let parent = doc.parent_map();
    for id in order {
        if doc.node(id).tag == POS_ELEMENT {
            if let Some(p) = parent.get(&id) {
                doc.detach(*p, id);
            }
        } else {
            doc.node_mut(id).remove_attr(POS_LINE);
            doc.node_mut(id).remove_attr(POS_COLUMN);
        }
    }
}

/// Remove every instrumentation marker from `doc`.
///
/// Standalone markers are deleted through the structural mutator. Ternary
/// markers are unwrapped: the marker expression is deleted and its condition
/// (the original expression) is reattached to the parent with the closing
/// parenthesis restored.
pub fn strip_markers(doc: &mut Document, parent: &mut HashMap<NodeId, NodeId>, prefix: &str) {
    for id in doc.bfs_order() {
        let tag = doc.node(id).tag.clone();
        if is_stmt_tag(&tag) && is_standalone_marker(doc, id, prefix) {
            if let Some(p) = parent.get(&id).copied() {
                delete_node(doc, p, id);
                parent.remove(&id);
            }
        } else if tag == "expr" && is_ternary_marker(doc, id, prefix) {
            let Some(p) = parent.get(&id).copied() else {
                continue;
            };
            delete_node(doc, p, id);
            if let Some(condition) = doc.find_path(id, &["ternary", "condition", "expr"]) {
                doc.node_mut(condition).tail = Some(")".to_string());
                doc.attach(p, condition);
                parent.insert(condition, p);
            }
            parent.remove(&id);
        }
    }
}

/// Statement units of `doc` in breadth-first order, markers excluded.
pub fn stmt_catalog(doc: &Document, prefix: &str) -> Vec<NodeId> {
    doc.bfs_order()
        .into_iter()
        .filter(|id| {
            is_stmt_tag(&doc.node(*id).tag) && !is_standalone_marker(doc, *id, prefix)
        })
        .collect()
}

/// One instrumented target file, fully reconciled: working tree, parent map,
/// statement catalog and the markers attributed to each statement.
///
/// The working tree is position-stripped; catalog and marker ids address its
/// arena (and any clone of it).
pub struct AnnotatedSource {
    pub doc: Document,
    pub parent: HashMap<NodeId, NodeId>,
    pub catalog: Vec<NodeId>,
    pub markers: HashMap<NodeId, Vec<NodeId>>,
}

impl AnnotatedSource {
    /// Parse and reconcile `filename` inside `dir`.
    ///
    /// Aborts with [`Error::Correlation`] when the marker-stripped tree does
    /// not render byte-identical to the `_original` reference file, or when a
    /// marker cannot be attributed to a statement.
    pub fn load(
        toolchain: &dyn Toolchain,
        dir: &Path,
        filename: &str,
        prefix: &str,
    ) -> Result<AnnotatedSource, Error> {
        let path = dir.join(filename);
        let reference_path = dir.join(reference_filename(filename));

        let doc = toolchain.parse(&path, true)?;
        let parent = doc.parent_map();

        sanity_check(&doc, &parent, &reference_path, prefix)?;

        let catalog = stmt_catalog(&doc, prefix);
        debug!("{filename}: {} statement units", catalog.len());

        let markers = attribute_markers(toolchain, &doc, &parent, &reference_path, prefix)?;

        // Positions have served their purpose (sanity check + marker
        // relocation); the working tree used for mutation is kept bare.
        let mut doc = doc;
        strip_positions(&mut doc);

        Ok(AnnotatedSource {
            doc,
            parent,
            catalog,
            markers,
        })
    }

    pub fn size(&self) -> usize {
        self.catalog.len()
    }

    /// Catalog indices of every unit nested inside unit `idx` (excluding
    /// `idx` itself): the closure set of a composite statement.
    pub fn nested_units(&self, idx: usize) -> Vec<usize> {
        let stmt = self.catalog[idx];
        self.doc
            .descendants(stmt)
            .into_iter()
            .filter(|d| *d != stmt)
            .filter_map(|d| self.catalog.iter().position(|u| *u == d))
            .collect()
    }

    /// Apply a per-file deletion slice (`deleted.len() == self.size()`) to a
    /// fresh copy of the working tree. Deleting a statement also deletes
    /// every marker attributed to it. Pure function of the snapshot and the
    /// slice.
    pub fn delete_units(&self, deleted: &[bool]) -> Document {
        debug_assert_eq!(deleted.len(), self.catalog.len());
        let mut doc = self.doc.clone();
        for (idx, flag) in deleted.iter().enumerate() {
            if !flag {
                continue;
            }
            let stmt = self.catalog[idx];
            if let Some(p) = self.parent.get(&stmt) {
                delete_node(&mut doc, *p, stmt);
            }
            for marker in self.markers.get(&stmt).into_iter().flatten() {
                if let Some(p) = self.parent.get(marker) {
                    delete_node(&mut doc, *p, *marker);
                }
            }
        }
        doc
    }
}

/// `foo.c` → `foo_original.c`, matching the on-disk layout of instrumented
/// projects.
pub fn reference_filename(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_original.{ext}"),
        None => format!("{filename}_original"),
    }
}

/// Render the marker-stripped tree and compare it byte-for-byte against the
/// reference source. A mismatch means node correlation cannot be trusted.
fn sanity_check(
    doc: &Document,
    parent: &HashMap<NodeId, NodeId>,
    reference_path: &Path,
    prefix: &str,
) -> Result<(), Error> {
    let mut stripped = doc.clone();
    let mut stripped_parent = parent.clone();
    strip_markers(&mut stripped, &mut stripped_parent, prefix);
    strip_positions(&mut stripped);
    let rendered = stripped.source_bytes();

    let reference = std::fs::read(reference_path).map_err(|e| {
        Error::configuration(format!(
            "cannot read reference source {}: {e}",
            reference_path.display()
        ))
    })?;

    if rendered != reference {
        let at = rendered
            .iter()
            .zip(reference.iter())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| rendered.len().min(reference.len()));
        return Err(Error::Correlation {
            file: PathBuf::from(reference_path),
            detail: format!(
                "marker-stripped render differs from reference at byte {at} \
                 (rendered {} bytes, reference {} bytes)",
                rendered.len(),
                reference.len()
            ),
        });
    }
    Ok(())
}

/// Build the statement → markers map.
///
/// Ternary markers sit inside the statement they belong to, so the parent
/// walk suffices. Standalone markers are physically detached from their
/// target: they record its (line, column), which is resolved in an
/// independent parse of the reference file and carried back into the working
/// tree by ordinal correlation.
fn attribute_markers(
    toolchain: &dyn Toolchain,
    doc: &Document,
    parent: &HashMap<NodeId, NodeId>,
    reference_path: &Path,
    prefix: &str,
) -> Result<HashMap<NodeId, Vec<NodeId>>, Error> {
    let mut markers: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

    let order = doc.bfs_order();
    let standalone: Vec<NodeId> = order
        .iter()
        .copied()
        .filter(|id| is_stmt_tag(&doc.node(*id).tag) && is_standalone_marker(doc, *id, prefix))
        .collect();
    let ternary: Vec<NodeId> = order
        .iter()
        .copied()
        .filter(|id| is_ternary_marker(doc, *id, prefix))
        .collect();

    if standalone.is_empty() && ternary.is_empty() {
        return Ok(markers);
    }

    // Reference parse with positions, and its position-stripped twin: the
    // twin is structurally identical to the marker-and-position-stripped
    // working tree (the sanity check vouches for the render), which is what
    // makes ordinal correlation between them sound.
    let reference = toolchain.parse(reference_path, true)?;
    let reference_parent = reference.parent_map();
    let mut reference_stripped = reference.clone();
    strip_positions(&mut reference_stripped);

    let mut working = doc.clone();
    let mut working_parent = parent.clone();
    strip_markers(&mut working, &mut working_parent, prefix);
    strip_positions(&mut working);

    let correlation_err = |marker: NodeId, detail: &str| Error::Correlation {
        file: PathBuf::from(reference_path),
        detail: format!("cannot attribute marker node {marker:?}: {detail}"),
    };

    for marker in standalone {
        let position = marker_target_position(doc, marker)
            .ok_or_else(|| correlation_err(marker, "marker lacks line/column literals"))?;
        let target = reference
            .node_at_position(position.line, position.column)
            .ok_or_else(|| {
                correlation_err(marker, "recorded position not found in reference parse")
            })?;
        let stmt_in_reference = enclosing_stmt(&reference, &reference_parent, target)
            .ok_or_else(|| correlation_err(marker, "no enclosing statement in reference"))?;
        // Arena ids survive the clone, so the statement can be located in the
        // stripped twin directly; the ordinal then maps into the working tree.
        let stmt_in_working = correlate(&working, &reference_stripped, stmt_in_reference)
            .ok_or_else(|| correlation_err(marker, "ordinal out of range in working tree"))?;
        markers.entry(stmt_in_working).or_default().push(marker);
    }

    for marker in ternary {
        let stmt = enclosing_stmt(doc, parent, marker)
            .ok_or_else(|| correlation_err(marker, "ternary marker outside any statement"))?;
        markers.entry(stmt).or_default().push(marker);
    }

    debug!(
        "attributed {} marker node(s) across {} statement(s)",
        markers.values().map(Vec::len).sum::<usize>(),
        markers.len()
    );
    Ok(markers)
}
