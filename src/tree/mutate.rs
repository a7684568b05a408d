//! Structural deletion that keeps the rendered source syntactically valid.
//!
//! Deleting a node from the markup tree removes its text, but the inter-token
//! trivia stored in `text`/`tail` slots still has to separate the surviving
//! tokens. Two reattachment rules cover this:
//!
//! 1. A deleted node that introduces a block scope takes its statement
//!    terminator with it, so a `;` is appended to the preceding sibling's
//!    tail (or to the parent's leading text if the node was first).
//! 2. A deleted node whose parent is a block scope carries trailing trivia
//!    (whitespace, comments) in its tail; that tail is reattached to the
//!    preceding sibling (or the parent's leading text) so the neighbouring
//!    tokens do not concatenate.
//!
//! Both rules apply to a block-introducing node nested directly in a block.

use crate::tree::{Document, NodeId};

/// Remove `child` from `parent`, preserving statement separation and
/// trailing trivia per the rules above.
pub fn delete_node(doc: &mut Document, parent: NodeId, child: NodeId) {
    let Some(child_idx) = doc.child_index(parent, child) else {
        // Already detached (e.g. a marker nested in a statement that was
        // deleted moments ago). Nothing to do.
        return;
    };

    if doc.node(child).tag.contains("block") {
        reattach_text(doc, parent, child_idx, ";");
    }

    if doc.node(parent).tag.contains("block") {
        if let Some(tail) = doc.node(child).tail.clone() {
            reattach_text(doc, parent, child_idx, &tail);
        }
    }

    doc.detach(parent, child);
}

/// Append `chunk` to the tail of the sibling preceding `child_idx`, or to the
/// parent's leading text when the child is first.
fn reattach_text(doc: &mut Document, parent: NodeId, child_idx: usize, chunk: &str) {
    if child_idx > 0 {
        let previous = doc.node(parent).children[child_idx - 1];
        append_slot(&mut doc.node_mut(previous).tail, chunk);
    } else {
        append_slot(&mut doc.node_mut(parent).text, chunk);
    }
}

fn append_slot(slot: &mut Option<String>, chunk: &str) {
    match slot {
        Some(existing) => existing.push_str(chunk),
        None => *slot = Some(chunk.to_string()),
    }
}
