//! Arena-backed annotated markup trees.
//!
//! The external structural toolchain hands us a position-annotated parse
//! tree of each source file (srcml-style markup: one element per syntactic
//! construct, source text distributed over element `text` and `tail` slots).
//! This module stores such trees in an arena addressed by [`NodeId`].
//!
//! Node identity is *per document*: cloning a [`Document`] copies the arena
//! verbatim, so ids remain meaningful in the clone, but ids from one parse
//! never address another parse. Structural queries (BFS order, parent map)
//! are re-derived from whichever document they are asked of.
//!
//! Rendering a tree back to source text is the concatenation of all `text`
//! and `tail` content in document order, which is exactly what the
//! toolchain's own printer does, so a structurally unedited tree renders
//! byte-identical to its input.

pub mod correlate;
pub mod mutate;
pub mod xml;

use std::collections::HashMap;

/// Attribute carrying the source line of a token element.
pub const POS_LINE: &str = "pos:line";
/// Attribute carrying the source column of a token element.
pub const POS_COLUMN: &str = "pos:column";
/// Tag of standalone position elements emitted by the toolchain.
pub const POS_ELEMENT: &str = "pos:position";

/// Statement-level tags: the constructs addressable as deletable units.
pub const STMT_TAGS: &[&str] = &[
    "expr_stmt",
    "decl_stmt",
    "function_decl",
    "function",
    "if",
    "while",
    "for",
    "do",
    "break",
    "continue",
    "return",
    "switch",
    "case",
    "default",
    "block",
    "label",
    "goto",
    "empty_stmt",
    "typedef",
];

/// Returns true if `tag` names a statement-level construct.
pub fn is_stmt_tag(tag: &str) -> bool {
    STMT_TAGS.contains(&tag)
}

/// Index of a node within one [`Document`]'s arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One element of the markup tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    /// Element tag, stored as written by the toolchain (including a
    /// namespace prefix where present, e.g. `pos:position`).
    pub tag: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Source text preceding the first child.
    pub text: Option<String>,
    /// Source text following this element's end, up to the next sibling.
    pub tail: Option<String>,
    /// Child elements in document order.
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Node {
            tag: tag.into(),
            attrs: Vec::new(),
            text: None,
            tail: None,
            children: Vec::new(),
        }
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove an attribute by name, if present.
    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(k, _)| k != name);
    }
}

/// A line/column pair as recorded by the toolchain (both 1-based).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// One parsed file held as an arena of nodes.
///
/// Detaching a node removes it from its parent's child list but keeps its
/// arena slot, so ids held by callers stay valid (the detached subtree simply
/// stops appearing in traversals and rendering).
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create a document with a single root element.
    pub fn new(root: Node) -> Self {
        Document {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Allocate a node without attaching it anywhere.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocate a node and append it to `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.alloc(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Re-attach an already allocated node at the end of `parent`'s children.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
    }

    /// Remove `child` from `parent`'s child list without any trivia
    /// reattachment. For deletions that must keep the rendered source
    /// syntactically valid, use [`mutate::delete_node`] instead.
    pub fn detach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.retain(|c| *c != child);
    }

    /// Position of `child` within `parent`'s child list.
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent).children.iter().position(|c| *c == child)
    }

    /// All attached nodes in breadth-first order starting at the root.
    ///
    /// This order is the basis of ordinal correlation between documents: it
    /// is stable across copies that differ only in attributes.
    pub fn bfs_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(self.root);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for child in &self.node(id).children {
                queue.push_back(*child);
            }
        }
        order
    }

    /// Child → parent map over all attached nodes.
    ///
    /// Must be rebuilt after any structural edit; parents of nodes untouched
    /// by an edit remain correct in a previously built map.
    pub fn parent_map(&self) -> HashMap<NodeId, NodeId> {
        let mut map = HashMap::new();
        for id in self.bfs_order() {
            for child in &self.node(id).children {
                map.insert(*child, id);
            }
        }
        map
    }

    /// Subtree of `id` in depth-first document order, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.node(id).children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    /// First attached descendant of `id` (in document order) whose tag
    /// matches the given path of tags, e.g. `&["expr", "call", "name"]`.
    pub fn find_path(&self, id: NodeId, path: &[&str]) -> Option<NodeId> {
        let mut current = id;
        for tag in path {
            current = *self
                .node(current)
                .children
                .iter()
                .find(|c| self.node(**c).tag == *tag)?;
        }
        Some(current)
    }

    /// Children of `id` whose tag matches `tag`, in document order.
    pub fn children_with_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|c| self.node(*c).tag == tag)
            .collect()
    }

    /// The recorded position of a node, if any descendant carries one.
    pub fn position(&self, id: NodeId) -> Option<Position> {
        self.descendants(id).into_iter().find_map(|d| {
            let node = self.node(d);
            let line = node.attr(POS_LINE)?.parse().ok()?;
            let column = node.attr(POS_COLUMN)?.parse().ok()?;
            Some(Position { line, column })
        })
    }

    /// First attached node (document order) recorded at exactly
    /// `(line, column)`. Requires a position-annotated document.
    pub fn node_at_position(&self, line: u32, column: u32) -> Option<NodeId> {
        self.descendants(self.root).into_iter().find(|id| {
            let node = self.node(*id);
            node.attr(POS_LINE).and_then(|v| v.parse().ok()) == Some(line)
                && node.attr(POS_COLUMN).and_then(|v| v.parse().ok()) == Some(column)
        })
    }

    /// Render the attached tree back to source bytes: the concatenation of
    /// all `text`/`tail` content in document order.
    pub fn source_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.render_node(self.root, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, out: &mut Vec<u8>) {
        let node = self.node(id);
        if let Some(text) = &node.text {
            out.extend_from_slice(text.as_bytes());
        }
        for child in &node.children {
            self.render_node(*child, out);
        }
        if let Some(tail) = &node.tail {
            out.extend_from_slice(tail.as_bytes());
        }
    }
}
