//! Best-effort, indentation-driven parsing of YAML-like documents.
//!
//! Every physical line becomes one [`Node`], whether or not it carries a
//! `key: value` pair, so node ids double as editor line numbers. Nesting is
//! derived purely from leading spaces; nothing here rejects input.

use std::collections::BTreeMap;

use tower_lsp::lsp_types::{Position, Range};

use crate::document::utf16_len;

/// Index of a node in its [`Forest`]. Equal to the node's line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// One line of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Text between the indentation and the first `:`; empty if there is none.
    pub key: String,
    /// Value after the `:`, without surrounding quotes if it was quoted.
    pub value: String,
    pub key_range: Range,
    pub value_range: Range,
    /// Number of leading spaces.
    pub indent: usize,
    pub parent: Option<NodeId>,
    /// Children by key. A later duplicate key replaces the earlier entry.
    pub children: BTreeMap<String, NodeId>,
}

/// All lines of a document linked into a forest by indentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    nodes: Vec<Node>,
    roots: BTreeMap<String, NodeId>,
}

impl Forest {
    /// Nodes in document order, one per line.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Node for an editor line, if the document has that many lines.
    pub fn line(&self, line: usize) -> Option<&Node> {
        self.nodes.get(line)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level node for a key.
    pub fn root(&self, key: &str) -> Option<NodeId> {
        self.roots.get(key).copied()
    }

    /// Direct child of `id` with the given key.
    pub fn child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.node(id).children.get(key).copied()
    }

    /// Iterate nodes together with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }
}

/// Parse document content into a [`Forest`].
///
/// A trailing newline does not produce an extra empty line, and a trailing
/// `\r` is dropped from each line, including a last line with no newline.
pub fn parse(source: &str) -> Forest {
    let mut forest = Forest::default();
    let mut stack: Vec<(NodeId, usize)> = Vec::new();

    let lines = source.lines().map(|l| l.strip_suffix('\r').unwrap_or(l));

    for (line_num, text) in lines.enumerate() {
        let id = NodeId(line_num);
        let mut node = parse_line(text, line_num as u32);

        // A child needs strictly more indentation than its parent.
        while stack.last().is_some_and(|&(_, indent)| indent >= node.indent) {
            stack.pop();
        }

        match stack.last() {
            Some(&(parent, _)) => {
                node.parent = Some(parent);
                forest.nodes[parent.0].children.insert(node.key.clone(), id);
            }
            None => {
                forest.roots.insert(node.key.clone(), id);
            }
        }

        stack.push((id, node.indent));
        forest.nodes.push(node);
    }

    forest
}

fn parse_line(text: &str, line: u32) -> Node {
    let indent = text.bytes().take_while(|&b| b == b' ').count();
    let column = |byte: usize| utf16_len(&text.as_bytes()[..byte]);
    let span = |start: usize, end: usize| {
        Range::new(
            Position::new(line, column(start)),
            Position::new(line, column(end)),
        )
    };

    let mut node = Node {
        key: String::new(),
        value: String::new(),
        key_range: span(indent, indent),
        value_range: span(text.len(), text.len()),
        indent,
        parent: None,
        children: BTreeMap::new(),
    };

    let Some(key_end) = text.find(':') else {
        return node;
    };

    node.key = text[indent..key_end].to_string();
    node.key_range = span(indent, key_end);

    let after = &text[key_end + 1..];
    let rest = after.trim_start_matches(' ');
    if rest.is_empty() {
        return node;
    }
    let value_start = text.len() - rest.len();

    if let Some(quote) = rest.chars().next().filter(|&c| c == '"' || c == '\'') {
        let Some(value_end) = text.rfind(quote).filter(|&end| end > value_start) else {
            return node;
        };

        node.value = text[value_start + 1..value_end].to_string();
        node.value_range = span(value_start + 1, value_end);
        return node;
    }

    node.value = rest.to_string();
    node.value_range = span(value_start, text.len());
    node
}
